//! Execution engine for ollamactl subcommands

pub mod executor;

pub use executor::{execute_command, ExecutionContext, ExecutionResult, ResultData, StatusReport};
