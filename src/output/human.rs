//! Human-readable output formatting

use bytesize::ByteSize;
use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::engine::executor::{ExecutionResult, ResultData, StatusReport};

pub fn format_human(result: &ExecutionResult, now: DateTime<Utc>) -> Option<String> {
    match &result.data {
        ResultData::Message(msg) => Some(msg.clone()),
        ResultData::Status(report) => Some(format_status(report, now)),
        ResultData::Exited(_) => None,
    }
}

fn format_status(report: &StatusReport, now: DateTime<Utc>) -> String {
    let mut output = String::from("Ollama Container\n----------------\n");
    output.push_str(&format!(
        "Runtime:   {} ({})\n",
        report.runtime.program.display(),
        report.runtime.flavor
    ));
    output.push_str(&format!("Host GPU:  {}\n", report.host_gpu));

    let Some(details) = &report.container else {
        output.push_str(&format!(
            "Container: {} {}\n",
            report.name,
            "(does not exist)".yellow()
        ));
        return output;
    };

    output.push_str(&format!("Container: {} ({})\n", details.name, short_id(&details.id)));

    let state = if details.running {
        details.status.green().to_string()
    } else {
        details.status.red().to_string()
    };
    match details.started_at.filter(|_| details.running) {
        Some(started) => output.push_str(&format!(
            "State:     {} (up {})\n",
            state,
            format_uptime(now - started)
        )),
        None => output.push_str(&format!("State:     {}\n", state)),
    }

    match report.image_size {
        Some(size) => output.push_str(&format!("Image:     {} ({})\n", details.image, ByteSize(size))),
        None => output.push_str(&format!("Image:     {}\n", details.image)),
    }
    if let Some(port) = details.port {
        output.push_str(&format!("API:       http://localhost:{}\n", port));
    }
    if let Some(volume) = &details.volume {
        output.push_str(&format!("Models:    {}\n", volume));
    }
    output.push_str(&format!("GPU:       {}\n", details.gpu));

    let env = details.env_lines();
    if !env.is_empty() {
        output.push_str("Env:\n");
        for line in env {
            output.push_str(&format!("  {}\n", line));
        }
    }
    output
}

fn short_id(id: &str) -> &str {
    let id = id.trim_start_matches("sha256:");
    &id[..id.len().min(12)]
}

fn format_uptime(elapsed: chrono::Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let mins = (secs % 3600) / 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, mins)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m", mins)
    }
}
