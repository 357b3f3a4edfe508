//! Error types for ollamactl

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OllamactlError {
    #[error("No container runtime found. Install docker or podman, or pass --runtime")]
    RuntimeNotFound,

    #[error("Container runtime '{0}' not found on PATH")]
    RuntimeMissing(String),

    #[error("Container '{0}' does not exist. Start it with `ollamactl run`")]
    ContainerNotFound(String),

    #[error("Container '{0}' is not running. Start it with `ollamactl run`")]
    ContainerNotRunning(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Command failed ({code}): {command}{}", runtime_reason(.stderr))]
    CommandFailed {
        command: String,
        code: i32,
        /// What the runtime printed to stderr, when it was captured
        stderr: String,
    },

    #[error("Could not parse inspect output: {0}")]
    Inspect(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl OllamactlError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            OllamactlError::CommandFailed { code, .. } if *code > 0 => *code,
            _ => 1,
        }
    }
}

fn runtime_reason(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!("\n{}", stderr)
    }
}

pub type Result<T> = std::result::Result<T, OllamactlError>;
