//! Description of the container to create

use serde::Serialize;

use crate::config::{ServeOptions, Volume};
use crate::probe::GpuVendor;

/// Everything `run` needs to create the container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// Host port published to the daemon's port
    pub port: u16,
    pub volume: Volume,
    pub serve: ServeOptions,
    pub gpu: GpuVendor,
}

impl ContainerSpec {
    /// Settings that differ between `self` and an existing container,
    /// as human-readable labels. Image is compared by reference.
    pub fn differences(&self, other: &ContainerSpec) -> Vec<&'static str> {
        let mut diffs = Vec::new();
        if self.image != other.image {
            diffs.push("image");
        }
        if self.port != other.port {
            diffs.push("port");
        }
        if self.volume != other.volume {
            diffs.push("volume");
        }
        if self.serve != other.serve {
            diffs.push("daemon settings");
        }
        if self.gpu != other.gpu {
            diffs.push("gpu");
        }
        diffs
    }

    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}
