//! ollamactl - run a single Ollama container on Docker or Podman
//!
//! ollamactl detects the container runtime and GPU on the host, builds the
//! runtime commands for each lifecycle operation and passes their output
//! through.
//!
//! # Example
//!
//! ```no_run
//! use ollamactl::{execute_command, format_output, ExecutionContext, Host, OutputFormat, SystemRunner};
//! use ollamactl::cli::SubCommand;
//!
//! let host = Host::current().unwrap();
//! let ctx = ExecutionContext::default();
//! let result = execute_command(&SubCommand::Status, &ctx, &host, &SystemRunner).unwrap();
//! if let Some(text) = format_output(&result, &OutputFormat::Human) {
//!     println!("{}", text);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod container;
pub mod engine;
pub mod error;
pub mod output;
pub mod probe;
pub mod runtime;

pub use container::{ContainerManager, ContainerSpec};
pub use engine::{execute_command, ExecutionContext, ExecutionResult};
pub use error::{OllamactlError, Result};
pub use output::{format_output, OutputFormat};
pub use probe::Host;
pub use runtime::{CommandRunner, SystemRunner};
