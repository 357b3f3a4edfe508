//! Container runtime discovery

use std::path::PathBuf;

use tracing::debug;

use super::{is_executable, Host};
use crate::error::{OllamactlError, Result};
use crate::runtime::{builder, CommandRunner, Flavor, Invocation, Runtime};

/// Binaries tried, in order, when no runtime is requested
pub const RUNTIME_CANDIDATES: [&str; 2] = ["docker", "podman"];

/// Resolve the runtime binary.
///
/// `requested` may be a bare name looked up on `PATH` or a path to a binary.
pub fn detect_runtime<R>(requested: Option<&str>, host: &Host, runner: &R) -> Result<Runtime>
where
    R: CommandRunner + ?Sized,
{
    let program = match requested {
        Some(requested) if requested.contains('/') => {
            let path = PathBuf::from(requested);
            if !is_executable(&path) {
                return Err(OllamactlError::RuntimeMissing(requested.to_string()));
            }
            path
        }
        Some(requested) => host
            .which(requested)
            .ok_or_else(|| OllamactlError::RuntimeMissing(requested.to_string()))?,
        None => RUNTIME_CANDIDATES
            .iter()
            .find_map(|candidate| host.which(candidate))
            .ok_or(OllamactlError::RuntimeNotFound)?,
    };

    let flavor = detect_flavor(&program, runner);
    debug!(program = %program.display(), %flavor, "using container runtime");
    Ok(Runtime::new(program, flavor))
}

/// Podman if the binary is named so or says so in `--version`.
///
/// The version check catches the `podman-docker` shim installed as `docker`.
pub fn detect_flavor<R>(program: &std::path::Path, runner: &R) -> Flavor
where
    R: CommandRunner + ?Sized,
{
    let named_podman = program
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase().contains("podman"))
        .unwrap_or(false);
    if named_podman {
        return Flavor::Podman;
    }

    match runner.capture(&Invocation::new(program, builder::version())) {
        Ok(output) if output.success() && output.stdout.to_lowercase().contains("podman") => {
            Flavor::Podman
        }
        Ok(_) => Flavor::Docker,
        Err(e) => {
            debug!(error = %e, "version probe failed, assuming docker");
            Flavor::Docker
        }
    }
}
