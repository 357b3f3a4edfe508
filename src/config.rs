//! Defaults and validated configuration values
//!
//! Every value here comes from a flag or its environment fallback; nothing is
//! persisted between invocations.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{OllamactlError, Result};

pub const DEFAULT_CONTAINER_NAME: &str = "ollama";
pub const DEFAULT_IMAGE: &str = "docker.io/ollama/ollama:latest";
pub const ROCM_IMAGE: &str = "docker.io/ollama/ollama:rocm";
pub const DEFAULT_VOLUME: &str = "ollama";
pub const DEFAULT_PORT: u16 = 11434;

/// Port the daemon listens on inside the container
pub const CONTAINER_PORT: u16 = 11434;
/// Model store inside the container
pub const CONTAINER_DATA_DIR: &str = "/root/.ollama";
pub const DEFAULT_SHELL: &str = "/bin/bash";

pub const ENV_DEBUG: &str = "OLLAMA_DEBUG";
pub const ENV_FLASH_ATTENTION: &str = "OLLAMA_FLASH_ATTENTION";
pub const ENV_KEEP_ALIVE: &str = "OLLAMA_KEEP_ALIVE";
pub const ENV_MAX_LOADED_MODELS: &str = "OLLAMA_MAX_LOADED_MODELS";
pub const ENV_NUM_PARALLEL: &str = "OLLAMA_NUM_PARALLEL";

/// The pass-through variables, in the order they are forwarded
pub const PASS_THROUGH_VARS: [&str; 5] = [
    ENV_DEBUG,
    ENV_FLASH_ATTENTION,
    ENV_KEEP_ALIVE,
    ENV_MAX_LOADED_MODELS,
    ENV_NUM_PARALLEL,
];

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").expect("valid regex"))
}

fn duration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+(\.\d+)?(ns|us|µs|ms|s|m|h))+$").expect("valid regex")
    })
}

/// Validate a container or volume name
pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(OllamactlError::Validation(format!(
            "invalid {} name '{}': use letters, digits, '_', '.' or '-', starting with a letter or digit",
            kind, name
        )))
    }
}

/// clap value parser for `--name`
pub fn parse_container_name(raw: &str) -> std::result::Result<String, String> {
    validate_name("container", raw)
        .map(|_| raw.to_string())
        .map_err(|e| e.to_string())
}

/// clap value parser for `--keep-alive`.
///
/// Accepts `-1` (keep loaded forever), a number of seconds, or a Go-style
/// duration string such as `5m` or `1h30m`.
pub fn parse_keep_alive(raw: &str) -> std::result::Result<String, String> {
    let value = raw.trim();
    if value == "-1" || value.parse::<u64>().is_ok() || duration_pattern().is_match(value) {
        Ok(value.to_string())
    } else {
        Err(format!(
            "invalid keep-alive '{}': expected -1, seconds, or a duration like 5m or 1h30m",
            raw
        ))
    }
}

/// clap value parser for counts that must be at least one
pub fn parse_positive(raw: &str) -> std::result::Result<u32, String> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("'{}' is not a positive integer", raw)),
    }
}

/// Where the model store lives on the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "source", rename_all = "lowercase")]
pub enum Volume {
    /// Runtime-managed named volume
    Named(String),
    /// Bind mount of an absolute host directory
    HostPath(PathBuf),
}

impl Volume {
    /// Classify a `--volume` value.
    ///
    /// Values containing `/` or starting with `.` or `~` are host paths; they are
    /// made absolute against `home` and `cwd`. Everything else is a named volume.
    pub fn parse(raw: &str, home: Option<&Path>, cwd: &Path) -> Result<Volume> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(OllamactlError::Validation("volume must not be empty".to_string()));
        }

        if raw.contains('/') || raw.starts_with('.') || raw.starts_with('~') {
            let path = if raw == "~" || raw.starts_with("~/") {
                let home = home.ok_or_else(|| {
                    OllamactlError::Validation(format!("cannot expand '{}': HOME is not set", raw))
                })?;
                home.join(raw.trim_start_matches('~').trim_start_matches('/'))
            } else if raw.starts_with('~') {
                return Err(OllamactlError::Validation(format!(
                    "cannot expand '{}': only ~/ is supported",
                    raw
                )));
            } else {
                cwd.join(raw)
            };
            return Ok(Volume::HostPath(normalize(&path)));
        }

        validate_name("volume", raw)?;
        Ok(Volume::Named(raw.to_string()))
    }

    /// The `source` half of a `-v source:target` mount
    pub fn source(&self) -> String {
        match self {
            Volume::Named(name) => name.clone(),
            Volume::HostPath(path) => path.display().to_string(),
        }
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Volume::Named(name) => write!(f, "volume {}", name),
            Volume::HostPath(path) => write!(f, "bind {}", path.display()),
        }
    }
}

/// Drop `.` segments and fold `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Daemon settings forwarded into the container as environment variables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServeOptions {
    pub debug: bool,
    pub flash_attention: bool,
    pub keep_alive: Option<String>,
    pub max_loaded_models: Option<u32>,
    pub num_parallel: Option<u32>,
}

impl ServeOptions {
    /// `KEY=VALUE` pairs for every option that is set
    pub fn env_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if self.debug {
            pairs.push((ENV_DEBUG, "1".to_string()));
        }
        if self.flash_attention {
            pairs.push((ENV_FLASH_ATTENTION, "1".to_string()));
        }
        if let Some(keep_alive) = &self.keep_alive {
            pairs.push((ENV_KEEP_ALIVE, keep_alive.clone()));
        }
        if let Some(n) = self.max_loaded_models {
            pairs.push((ENV_MAX_LOADED_MODELS, n.to_string()));
        }
        if let Some(n) = self.num_parallel {
            pairs.push((ENV_NUM_PARALLEL, n.to_string()));
        }
        pairs
    }

    /// Rebuild options from a container's environment.
    ///
    /// Unknown keys are ignored; values that no longer validate are dropped.
    pub fn from_env<'a, I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut options = ServeOptions::default();
        for (key, value) in vars {
            match key {
                ENV_DEBUG => options.debug = is_truthy(value),
                ENV_FLASH_ATTENTION => options.flash_attention = is_truthy(value),
                ENV_KEEP_ALIVE => options.keep_alive = parse_keep_alive(value).ok(),
                ENV_MAX_LOADED_MODELS => options.max_loaded_models = parse_positive(value).ok(),
                ENV_NUM_PARALLEL => options.num_parallel = parse_positive(value).ok(),
                _ => {}
            }
        }
        options
    }

    pub fn is_empty(&self) -> bool {
        self.env_pairs().is_empty()
    }
}

/// Boolean environment flags accept `1`, `true`, `yes` and `on`
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
