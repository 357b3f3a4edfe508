//! Output formatting

use chrono::Utc;

use crate::engine::executor::ExecutionResult;
use crate::output::human::format_human;
use crate::output::json::format_json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Render a result; `None` when there is nothing left to print
pub fn format_output(result: &ExecutionResult, format: &OutputFormat) -> Option<String> {
    match format {
        OutputFormat::Human => format_human(result, Utc::now()),
        OutputFormat::Json => format_json(result),
    }
}
