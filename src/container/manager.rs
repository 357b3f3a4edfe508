//! Lifecycle operations on the managed container
//!
//! The ContainerManager owns the container name and the resolved runtime, and
//! turns each operation into runtime invocations. Operations that need the
//! container check for it first and fail with a clear error when it is absent.

use std::fs;

use tracing::{debug, info, warn};

use super::inspect::{parse_container_inspect, parse_image_inspect, same_image, ContainerDetails, ImageDetails};
use super::spec::ContainerSpec;
use crate::config::Volume;
use crate::error::{OllamactlError, Result};
use crate::runtime::builder::{self, LogOptions};
use crate::runtime::{CapturedOutput, CommandRunner, Invocation, Runtime};

/// How `run` left things
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Created,
    Recreated,
    /// An existing stopped container was started as-is
    Started { ignored: Vec<&'static str> },
    AlreadyRunning { ignored: Vec<&'static str> },
}

/// How `update` left things
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate,
    Updated,
    /// Image pulled; there was no container to move onto it
    PulledOnly,
}

/// Manages the single named container through a runtime binary
pub struct ContainerManager<'r, R: CommandRunner + ?Sized> {
    runtime: Runtime,
    runner: &'r R,
    name: String,
    dry_run: bool,
    stdout_reserved: bool,
}

impl<'r, R: CommandRunner + ?Sized> ContainerManager<'r, R> {
    pub fn new(runtime: Runtime, runner: &'r R, name: &str) -> Self {
        Self {
            runtime,
            runner,
            name: name.to_string(),
            dry_run: false,
            stdout_reserved: false,
        }
    }

    /// Print mutating commands instead of running them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Keep stdout for the final result (e.g. `--json`); runtime output and
    /// dry-run lines go to stderr instead
    pub fn with_stdout_reserved(mut self, reserved: bool) -> Self {
        self.stdout_reserved = reserved;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Read-only query; a non-zero exit is an error
    fn query(&self, args: Vec<String>) -> Result<CapturedOutput> {
        let invocation = self.runtime.invocation(args);
        let output = self.runner.capture(&invocation)?;
        if !output.success() {
            return Err(OllamactlError::CommandFailed {
                command: invocation.to_string(),
                code: output.code.unwrap_or(1),
                stderr: output.stderr,
            });
        }
        Ok(output)
    }

    /// Run a command with its output passed through, honoring dry-run
    fn execute(&self, args: Vec<String>) -> Result<()> {
        let invocation = self.runtime.invocation(args);
        if self.dry_run {
            self.announce(&invocation);
            return Ok(());
        }
        let code = if self.stdout_reserved {
            self.runner.forward_to_stderr(&invocation)?
        } else {
            self.runner.forward(&invocation, None)?
        };
        check_exit(&invocation, code)
    }

    fn announce(&self, invocation: &Invocation) {
        if self.stdout_reserved {
            eprintln!("[dry-run] {}", invocation);
        } else {
            println!("[dry-run] {}", invocation);
        }
    }

    /// Does a container by this name exist (running or not)?
    pub fn exists(&self) -> Result<bool> {
        let output = self.query(builder::ps_names(&self.name))?;
        Ok(output.stdout.lines().any(|line| line.trim() == self.name))
    }

    pub fn inspect(&self) -> Result<ContainerDetails> {
        let output = self.query(builder::inspect_container(&self.name))?;
        parse_container_inspect(&self.name, &output.stdout)
    }

    pub fn inspect_image(&self, image: &str) -> Result<ImageDetails> {
        let output = self.query(builder::inspect_image(image))?;
        parse_image_inspect(image, &output.stdout)
    }

    fn require_existing(&self) -> Result<()> {
        if self.exists()? {
            Ok(())
        } else {
            Err(OllamactlError::ContainerNotFound(self.name.clone()))
        }
    }

    fn require_running(&self) -> Result<ContainerDetails> {
        self.require_existing()?;
        let details = self.inspect()?;
        if details.running {
            Ok(details)
        } else {
            Err(OllamactlError::ContainerNotRunning(self.name.clone()))
        }
    }

    fn create(&self, spec: &ContainerSpec) -> Result<()> {
        if let Volume::HostPath(path) = &spec.volume {
            if !self.dry_run && !path.exists() {
                info!(path = %path.display(), "creating model directory");
                fs::create_dir_all(path)?;
            }
        }
        info!(name = %spec.name, image = %spec.image, port = spec.port, "creating container");
        self.execute(builder::run(spec, self.runtime.flavor))
    }

    fn replace(&self, spec: &ContainerSpec) -> Result<()> {
        info!(name = %self.name, "removing container for recreation");
        self.execute(builder::remove(&self.name, true))?;
        self.create(spec)
    }

    /// Create the container, or start/keep the existing one
    pub fn run(&self, spec: &ContainerSpec, recreate: bool) -> Result<RunOutcome> {
        if !self.exists()? {
            self.create(spec)?;
            return Ok(RunOutcome::Created);
        }

        if recreate {
            self.replace(spec)?;
            return Ok(RunOutcome::Recreated);
        }

        let details = self.inspect()?;
        let ignored = match details.to_spec(None) {
            Ok(current) => spec.differences(&current),
            Err(e) => {
                debug!(error = %e, "could not compare with existing container");
                Vec::new()
            }
        };
        if !ignored.is_empty() {
            warn!(
                settings = %ignored.join(", "),
                "existing container differs from requested settings; pass --recreate to apply them"
            );
        }

        if details.running {
            return Ok(RunOutcome::AlreadyRunning { ignored });
        }

        self.execute(builder::start(&self.name))?;
        Ok(RunOutcome::Started { ignored })
    }

    /// Stop and remove the container
    pub fn stop(&self) -> Result<()> {
        self.require_existing()?;
        let details = self.inspect()?;
        if details.running {
            self.execute(builder::stop(&self.name))?;
        }
        self.execute(builder::remove(&self.name, false))
    }

    pub fn restart(&self) -> Result<()> {
        self.require_existing()?;
        self.execute(builder::restart(&self.name))
    }

    pub fn pull(&self, image: &str) -> Result<()> {
        self.execute(builder::pull(image))
    }

    /// Rebuild the container from its own settings
    pub fn recreate(&self, image: Option<&str>) -> Result<ContainerSpec> {
        self.require_existing()?;
        let details = self.inspect()?;
        let spec = details.to_spec(image)?;
        self.replace(&spec)?;
        Ok(spec)
    }

    /// Pull the image and move the container onto it if it changed
    pub fn update(&self, image: Option<&str>, fallback_image: &str) -> Result<UpdateOutcome> {
        if !self.exists()? {
            self.pull(image.unwrap_or(fallback_image))?;
            return Ok(UpdateOutcome::PulledOnly);
        }

        let details = self.inspect()?;
        let image = image.unwrap_or(&details.image).to_string();
        self.pull(&image)?;

        let pulled = self.inspect_image(&image)?;
        if same_image(&pulled.id, &details.image_id) {
            info!(image = %image, "image unchanged");
            return Ok(UpdateOutcome::UpToDate);
        }

        info!(old = %details.image_id, new = %pulled.id, "image changed, recreating");
        let spec = details.to_spec(Some(&image))?;
        self.replace(&spec)?;
        Ok(UpdateOutcome::Updated)
    }

    /// Stream container logs with each line prefixed. Returns the runtime's
    /// exit code.
    pub fn logs(&self, options: &LogOptions, prefix: Option<&str>) -> Result<Option<i32>> {
        self.require_existing()?;
        let invocation = self.runtime.invocation(builder::logs(&self.name, options));
        self.runner.forward(&invocation, prefix)
    }

    /// Run a command inside the running container. Returns its exit code.
    pub fn exec(&self, tty: bool, command: &[String]) -> Result<Option<i32>> {
        self.require_running()?;
        let invocation = self.runtime.invocation(builder::exec(&self.name, tty, command));
        if self.dry_run {
            self.announce(&invocation);
            return Ok(Some(0));
        }
        self.runner.forward(&invocation, None)
    }

    /// Details of the container, or `None` when it does not exist
    pub fn details(&self) -> Result<Option<ContainerDetails>> {
        if !self.exists()? {
            return Ok(None);
        }
        self.inspect().map(Some)
    }
}

fn check_exit(invocation: &Invocation, code: Option<i32>) -> Result<()> {
    match code {
        Some(0) => Ok(()),
        other => Err(OllamactlError::CommandFailed {
            command: invocation.to_string(),
            code: other.unwrap_or(1),
            stderr: String::new(),
        }),
    }
}
