//! Container runtime access
//!
//! A [`Runtime`] is a resolved Docker- or Podman-compatible binary. The
//! [`builder`] module assembles argument vectors for it and the [`executor`]
//! module runs them.

pub mod builder;
pub mod executor;

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

pub use executor::{CapturedOutput, CommandRunner, Invocation, SystemRunner};

/// Runtime CLI dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    Docker,
    Podman,
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flavor::Docker => write!(f, "docker"),
            Flavor::Podman => write!(f, "podman"),
        }
    }
}

/// A container runtime binary and its dialect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Runtime {
    pub program: PathBuf,
    pub flavor: Flavor,
}

impl Runtime {
    pub fn new(program: impl Into<PathBuf>, flavor: Flavor) -> Self {
        Self {
            program: program.into(),
            flavor,
        }
    }

    /// Bind an argument vector to this runtime's binary
    pub fn invocation(&self, args: Vec<String>) -> Invocation {
        Invocation::new(self.program.clone(), args)
    }
}
