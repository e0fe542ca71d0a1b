//! Printing run events to stdout.

use std::io::{self, Write};

use chrono::Local;
use goalrun_agent::{Message, MessageKind, RunEvent, RunReport, RunStatus, TaskStatus};
use serde_json::json;

/// Output format for run events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    /// One JSON object per line.
    Json,
}

/// Render one event as a single line of output.
pub fn render(event: &RunEvent, format: Format) -> String {
    match format {
        Format::Json => render_json(event),
        Format::Text => render_text(event),
    }
}

/// Write an event to stdout. Write errors (a closed pipe) are ignored.
pub fn print(event: &RunEvent, format: Format) {
    let line = render(event, format);
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{}", line);
    let _ = stdout.flush();
}

/// The final report as one JSON line.
pub fn report_json(report: &RunReport) -> String {
    json!({
        "event": "report",
        "report": report,
    })
    .to_string()
}

fn render_json(event: &RunEvent) -> String {
    let value = match event {
        RunEvent::Message(message) => json!({
            "event": "message",
            "message": message,
        }),
        RunEvent::Status(status) => json!({
            "event": "status",
            "status": status,
        }),
    };
    value.to_string()
}

fn render_text(event: &RunEvent) -> String {
    match event {
        RunEvent::Message(message) => render_message(message),
        RunEvent::Status(status) => format!(
            "[{}] status: {}",
            Local::now().format("%H:%M:%S"),
            status_label(*status)
        ),
    }
}

fn render_message(message: &Message) -> String {
    let time = message.timestamp.with_timezone(&Local).format("%H:%M:%S");
    match message.kind {
        MessageKind::Goal => format!("[{}] Embarking on a new goal: {}", time, message.value),
        MessageKind::Thinking => format!("[{}] {}", time, message.value),
        MessageKind::Task {
            task_id,
            status: TaskStatus::Completed,
        } => format!("[{}] {} completed:\n{}", time, task_id, indent(&message.value)),
        MessageKind::Task { task_id, .. } => {
            format!("[{}] {} executing: {}", time, task_id, message.value)
        }
        MessageKind::SystemNotice => format!("[{}] {}", time, message.value),
        MessageKind::Error { .. } => format!("[{}] error: {}", time, message.value),
    }
}

fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Idle => "idle",
        RunStatus::Running => "running",
        RunStatus::Paused => "paused (s = step, r = resume, q = stop)",
        RunStatus::Stopped => "stopped",
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}
