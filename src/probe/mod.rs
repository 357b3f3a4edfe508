//! Host capability detection
//!
//! Finds the container runtime binary and checks for a usable GPU. All
//! lookups go through [`Host`] so they can be pointed at a fake filesystem.

mod gpu;
mod runtime;

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub use gpu::{default_image, detect_gpu, resolve_gpu, GpuMode, GpuVendor};
pub use runtime::{detect_flavor, detect_runtime, RUNTIME_CANDIDATES};

/// The parts of the host environment the probes look at
#[derive(Debug, Clone)]
pub struct Host {
    /// Value of `PATH`
    pub path: Option<OsString>,
    pub home: Option<PathBuf>,
    pub cwd: PathBuf,
    /// Prefix for device node checks, `/` on a real host
    pub dev_root: PathBuf,
}

impl Host {
    /// Snapshot of the current process environment
    pub fn current() -> Result<Self> {
        Ok(Self {
            path: env::var_os("PATH"),
            home: env::var_os("HOME").map(PathBuf::from),
            cwd: env::current_dir()?,
            dev_root: PathBuf::from("/"),
        })
    }

    /// First executable called `name` on `PATH`
    pub fn which(&self, name: &str) -> Option<PathBuf> {
        let path = self.path.as_ref()?;
        env::split_paths(path)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate))
    }

    /// Whether a device node such as `/dev/kfd` exists
    pub fn has_device(&self, device: &str) -> bool {
        self.dev_root.join(device.trim_start_matches('/')).exists()
    }
}

#[cfg(unix)]
pub(crate) fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub(crate) fn is_executable(path: &Path) -> bool {
    path.is_file()
}


#[cfg(test)]
mod tests {
    use super::testing::{host_in, stub_binary};
    use super::*;
    use std::fs;

    #[test]
    fn test_which_finds_executable() {
        let dir = tempfile::tempdir().unwrap();
        let docker = stub_binary(dir.path(), "docker");
        let host = host_in(dir.path());
        assert_eq!(host.which("docker"), Some(docker));
        assert_eq!(host.which("podman"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_which_skips_non_executable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("podman"), "not a program").unwrap();
        let host = host_in(dir.path());
        assert_eq!(host.which("podman"), None);
    }

    #[test]
    fn test_which_without_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = host_in(dir.path());
        host.path = None;
        assert_eq!(host.which("docker"), None);
    }

    #[test]
    fn test_has_device() {
        let dir = tempfile::tempdir().unwrap();
        let host = host_in(dir.path());
        assert!(!host.has_device("/dev/kfd"));
        fs::create_dir_all(dir.path().join("dev-root/dev")).unwrap();
        fs::write(dir.path().join("dev-root/dev/kfd"), "").unwrap();
        assert!(host.has_device("/dev/kfd"));
    }
}
