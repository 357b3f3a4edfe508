//! GPU detection

use std::fmt;

use clap::ValueEnum;
use serde::Serialize;
use tracing::debug;

use super::Host;
use crate::config::{DEFAULT_IMAGE, ROCM_IMAGE};
use crate::runtime::{CommandRunner, Invocation};

/// What the user asked for with `--gpu`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GpuMode {
    /// Use whatever GPU the host has
    #[default]
    Auto,
    Nvidia,
    Amd,
    /// CPU only
    None,
}

/// The GPU a container is (or will be) given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuVendor {
    #[default]
    None,
    Nvidia,
    Amd,
}

impl fmt::Display for GpuVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuVendor::None => write!(f, "none"),
            GpuVendor::Nvidia => write!(f, "nvidia"),
            GpuVendor::Amd => write!(f, "amd"),
        }
    }
}

/// Probe the host: NVIDIA if `nvidia-smi -L` lists a GPU, AMD if the ROCm
/// compute device exists, otherwise none.
pub fn detect_gpu<R>(host: &Host, runner: &R) -> GpuVendor
where
    R: CommandRunner + ?Sized,
{
    if let Some(smi) = host.which("nvidia-smi") {
        let probe = Invocation::new(smi, vec!["-L".to_string()]);
        match runner.capture(&probe) {
            Ok(output) if output.success() && output.stdout.contains("GPU") => {
                return GpuVendor::Nvidia;
            }
            Ok(output) => debug!(code = ?output.code, "nvidia-smi found but lists no GPU"),
            Err(e) => debug!(error = %e, "nvidia-smi failed"),
        }
    }

    if host.has_device("/dev/kfd") {
        return GpuVendor::Amd;
    }

    GpuVendor::None
}

pub fn resolve_gpu<R>(mode: GpuMode, host: &Host, runner: &R) -> GpuVendor
where
    R: CommandRunner + ?Sized,
{
    match mode {
        GpuMode::Auto => detect_gpu(host, runner),
        GpuMode::Nvidia => GpuVendor::Nvidia,
        GpuMode::Amd => GpuVendor::Amd,
        GpuMode::None => GpuVendor::None,
    }
}

/// AMD GPUs need the ROCm build of the image
pub fn default_image(vendor: GpuVendor) -> &'static str {
    match vendor {
        GpuVendor::Amd => ROCM_IMAGE,
        _ => DEFAULT_IMAGE,
    }
}
