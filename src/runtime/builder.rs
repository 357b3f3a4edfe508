//! Argument vectors for runtime subcommands
//!
//! Every function returns the arguments that follow the runtime binary, in
//! the form both Docker and Podman accept unless a [`Flavor`] says otherwise.

use crate::config::{Volume, CONTAINER_DATA_DIR, CONTAINER_PORT};
use crate::container::ContainerSpec;
use crate::probe::GpuVendor;
use crate::runtime::Flavor;

fn strings<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Anchored name filter so `ollama` does not match `ollama-old`
fn name_filter(name: &str) -> String {
    format!("name=^{}$", name)
}

/// Names of all containers (running or not) called `name`
pub fn ps_names(name: &str) -> Vec<String> {
    let filter = name_filter(name);
    strings(["ps", "-a", "--filter", filter.as_str(), "--format", "{{.Names}}"])
}

pub fn inspect_container(name: &str) -> Vec<String> {
    strings(["container", "inspect", name])
}

pub fn inspect_image(image: &str) -> Vec<String> {
    strings(["image", "inspect", image])
}

pub fn version() -> Vec<String> {
    strings(["--version"])
}

pub fn pull(image: &str) -> Vec<String> {
    strings(["pull", image])
}

pub fn start(name: &str) -> Vec<String> {
    strings(["start", name])
}

pub fn stop(name: &str) -> Vec<String> {
    strings(["stop", name])
}

pub fn restart(name: &str) -> Vec<String> {
    strings(["restart", name])
}

pub fn remove(name: &str, force: bool) -> Vec<String> {
    if force {
        strings(["rm", "-f", name])
    } else {
        strings(["rm", name])
    }
}

/// Flags granting the container access to the host GPU
pub fn gpu_flags(vendor: GpuVendor, flavor: Flavor) -> Vec<String> {
    match (vendor, flavor) {
        (GpuVendor::None, _) => Vec::new(),
        (GpuVendor::Nvidia, Flavor::Docker) => strings(["--gpus=all"]),
        (GpuVendor::Nvidia, Flavor::Podman) => strings(["--device", "nvidia.com/gpu=all"]),
        (GpuVendor::Amd, _) => strings(["--device", "/dev/kfd", "--device", "/dev/dri"]),
    }
}

/// `-v` mount for the model store
fn volume_mount(volume: &Volume, flavor: Flavor) -> String {
    let mount = format!("{}:{}", volume.source(), CONTAINER_DATA_DIR);
    match (volume, flavor) {
        // SELinux hosts refuse unlabeled bind mounts under Podman.
        (Volume::HostPath(_), Flavor::Podman) => format!("{}:Z", mount),
        _ => mount,
    }
}

/// Create and start a detached container from `spec`
pub fn run(spec: &ContainerSpec, flavor: Flavor) -> Vec<String> {
    let mut args = strings(["run", "-d", "--name", spec.name.as_str()]);
    args.push("-p".to_string());
    args.push(format!("{}:{}", spec.port, CONTAINER_PORT));
    args.push("-v".to_string());
    args.push(volume_mount(&spec.volume, flavor));
    args.extend(gpu_flags(spec.gpu, flavor));
    for (key, value) in spec.serve.env_pairs() {
        args.push("-e".to_string());
        args.push(format!("{}={}", key, value));
    }
    args.extend(strings(["--restart", "unless-stopped"]));
    args.push(spec.image.clone());
    args
}

/// Options for `logs`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    pub follow: bool,
    pub tail: Option<String>,
    pub since: Option<String>,
    pub timestamps: bool,
}

pub fn logs(name: &str, options: &LogOptions) -> Vec<String> {
    let mut args = strings(["logs"]);
    if options.follow {
        args.push("--follow".to_string());
    }
    if let Some(tail) = &options.tail {
        args.push("--tail".to_string());
        args.push(tail.clone());
    }
    if let Some(since) = &options.since {
        args.push("--since".to_string());
        args.push(since.clone());
    }
    if options.timestamps {
        args.push("--timestamps".to_string());
    }
    args.push(name.to_string());
    args
}

/// Run `command` inside the container.
///
/// `-i` keeps stdin attached so prompts can be piped in; `-t` is only added
/// when there is a terminal to allocate for.
pub fn exec(name: &str, tty: bool, command: &[String]) -> Vec<String> {
    let mut args = strings(["exec", "-i"]);
    if tty {
        args.push("-t".to_string());
    }
    args.push(name.to_string());
    args.extend(command.iter().cloned());
    args
}
