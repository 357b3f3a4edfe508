//! JSON output formatting

use crate::engine::executor::{ExecutionResult, ResultData};
use serde_json::{json, Value};

pub fn format_json(result: &ExecutionResult) -> Option<String> {
    let data: Value = match &result.data {
        ResultData::Status(report) => serde_json::to_value(report).unwrap_or(json!(null)),
        ResultData::Message(s) => json!({ "message": s }),
        ResultData::Exited(_) => return None,
    };

    Some(serde_json::to_string_pretty(&data).unwrap_or_else(|_| "{}".to_string()))
}
