//! Parsing of `container inspect` and `image inspect` output
//!
//! Both Docker and Podman print a JSON array of objects with PascalCase keys.
//! Only the fields needed to recreate the container are read; everything else
//! is ignored so either runtime's extra fields pass through.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::spec::ContainerSpec;
use crate::config::{ServeOptions, Volume, CONTAINER_DATA_DIR, CONTAINER_PORT, PASS_THROUGH_VARS};
use crate::error::{OllamactlError, Result};
use crate::probe::GpuVendor;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawContainer {
    id: String,
    #[serde(default)]
    name: String,
    /// Image id the container was created from
    #[serde(default)]
    image: String,
    #[serde(default)]
    config: RawConfig,
    #[serde(default)]
    state: RawState,
    #[serde(default)]
    host_config: RawHostConfig,
    #[serde(default)]
    mounts: Option<Vec<RawMount>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawConfig {
    #[serde(default)]
    image: String,
    #[serde(default)]
    env: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawState {
    #[serde(default)]
    status: String,
    #[serde(default)]
    running: bool,
    #[serde(default)]
    started_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawHostConfig {
    #[serde(default)]
    port_bindings: Option<HashMap<String, Option<Vec<RawPortBinding>>>>,
    #[serde(default)]
    device_requests: Option<Vec<RawDeviceRequest>>,
    #[serde(default)]
    devices: Option<Vec<RawDevice>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPortBinding {
    #[serde(default)]
    host_port: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawDeviceRequest {
    #[serde(default)]
    driver: Option<String>,
    #[serde(default)]
    capabilities: Option<Vec<Vec<String>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawDevice {
    #[serde(default)]
    path_on_host: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawMount {
    #[serde(rename = "Type", default)]
    kind: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    destination: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawImage {
    id: String,
    #[serde(default)]
    size: Option<u64>,
}

/// What the runtime reports about the managed container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerDetails {
    pub id: String,
    pub name: String,
    /// Image reference the container was created with
    pub image: String,
    pub image_id: String,
    pub status: String,
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub port: Option<u16>,
    pub volume: Option<Volume>,
    pub serve: ServeOptions,
    pub gpu: GpuVendor,
}

impl ContainerDetails {
    /// Spec that recreates this container, optionally on a different image
    pub fn to_spec(&self, image: Option<&str>) -> Result<ContainerSpec> {
        let port = self.port.ok_or_else(|| {
            OllamactlError::Validation(format!(
                "container '{}' does not publish port {}; remove it and use `run`",
                self.name, CONTAINER_PORT
            ))
        })?;
        let volume = self.volume.clone().ok_or_else(|| {
            OllamactlError::Validation(format!(
                "container '{}' has no mount at {}; remove it and use `run`",
                self.name, CONTAINER_DATA_DIR
            ))
        })?;

        Ok(ContainerSpec {
            name: self.name.clone(),
            image: image.unwrap_or(&self.image).to_string(),
            port,
            volume,
            serve: self.serve.clone(),
            gpu: self.gpu,
        })
    }

    /// Forwarded daemon variables as `KEY=VALUE`
    pub fn env_lines(&self) -> Vec<String> {
        self.serve
            .env_pairs()
            .into_iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect()
    }
}

/// What the runtime reports about an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageDetails {
    pub id: String,
    pub size: Option<u64>,
}

/// Parse `container inspect <name>` output
pub fn parse_container_inspect(name: &str, json: &str) -> Result<ContainerDetails> {
    let mut entries: Vec<RawContainer> = serde_json::from_str(json)?;
    if entries.is_empty() {
        return Err(OllamactlError::ContainerNotFound(name.to_string()));
    }
    let raw = entries.swap_remove(0);

    let env = raw.config.env.unwrap_or_default();
    let serve = ServeOptions::from_env(
        env.iter()
            .filter_map(|line| line.split_once('='))
            .filter(|(key, _)| PASS_THROUGH_VARS.contains(key)),
    );

    let container_name = raw.name.trim_start_matches('/');
    Ok(ContainerDetails {
        id: raw.id,
        name: if container_name.is_empty() {
            name.to_string()
        } else {
            container_name.to_string()
        },
        image: raw.config.image,
        image_id: raw.image,
        status: raw.state.status,
        running: raw.state.running,
        started_at: raw.state.started_at.as_deref().and_then(parse_timestamp),
        port: published_port(&raw.host_config),
        volume: raw.mounts.as_deref().and_then(data_volume),
        serve,
        gpu: gpu_access(&raw.host_config),
    })
}

/// Parse `image inspect <image>` output
pub fn parse_image_inspect(image: &str, json: &str) -> Result<ImageDetails> {
    let mut entries: Vec<RawImage> = serde_json::from_str(json)?;
    if entries.is_empty() {
        return Err(OllamactlError::Validation(format!("image '{}' not found", image)));
    }
    let raw = entries.swap_remove(0);
    Ok(ImageDetails {
        id: raw.id,
        size: raw.size,
    })
}

/// Docker prefixes ids with the digest algorithm, Podman does not
pub fn same_image(a: &str, b: &str) -> bool {
    let strip = |id: &str| id.trim().trim_start_matches("sha256:").to_ascii_lowercase();
    !a.trim().is_empty() && strip(a) == strip(b)
}

/// Zero time means never started
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
        .filter(|t| t.year() > 1)
}

fn published_port(host_config: &RawHostConfig) -> Option<u16> {
    let key = format!("{}/tcp", CONTAINER_PORT);
    host_config
        .port_bindings
        .as_ref()?
        .get(&key)?
        .as_ref()?
        .iter()
        .find_map(|binding| binding.host_port.parse().ok())
}

fn data_volume(mounts: &[RawMount]) -> Option<Volume> {
    let mount = mounts
        .iter()
        .find(|m| m.destination.trim_end_matches('/') == CONTAINER_DATA_DIR)?;

    match mount.kind.as_deref() {
        Some("volume") => mount.name.clone().map(Volume::Named),
        _ => mount.source.clone().map(|s| Volume::HostPath(PathBuf::from(s))),
    }
}

fn gpu_access(host_config: &RawHostConfig) -> GpuVendor {
    let nvidia_request = host_config.device_requests.iter().flatten().any(|req| {
        req.driver.as_deref() == Some("nvidia")
            || req
                .capabilities
                .iter()
                .flatten()
                .flatten()
                .any(|cap| cap == "gpu")
    });
    if nvidia_request {
        return GpuVendor::Nvidia;
    }

    let devices: Vec<&str> = host_config
        .devices
        .iter()
        .flatten()
        .map(|d| d.path_on_host.as_str())
        .collect();
    if devices.iter().any(|d| d.starts_with("nvidia.com/gpu") || d.starts_with("/dev/nvidia")) {
        GpuVendor::Nvidia
    } else if devices.contains(&"/dev/kfd") {
        GpuVendor::Amd
    } else {
        GpuVendor::None
    }
}
