//! Progress messages emitted by a run.
//!
//! The message stream is append-only and ordered by emission time. A
//! consumer that replays it in order can rebuild the full task history,
//! see [`crate::replay`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{TaskId, TaskStatus};

/// A progress record emitted by the run loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Position in the run's message stream, starting at 0.
    pub seq: u64,
    /// What kind of record this is.
    pub kind: MessageKind,
    /// Text payload.
    pub value: String,
    /// When the message was emitted.
    pub timestamp: DateTime<Utc>,
}

/// Kind of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    /// The goal the run is pursuing.
    Goal,
    /// The loop is waiting on the backend.
    Thinking,
    /// A task changed status. The value is the description when
    /// `Executing`, and the result when `Completed`.
    Task { task_id: TaskId, status: TaskStatus },
    /// Informational notice (completion, loop limit, stop).
    SystemNotice,
    /// A failure. Carries the task id when the failure concerns a task.
    Error { task_id: Option<TaskId> },
}

impl Message {
    /// Create a new message with the current timestamp.
    pub fn new(seq: u64, kind: MessageKind, value: impl Into<String>) -> Self {
        Self {
            seq,
            kind,
            value: value.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a Goal message.
    pub fn goal(seq: u64, goal: impl Into<String>) -> Self {
        Self::new(seq, MessageKind::Goal, goal)
    }

    /// Create a Thinking message.
    pub fn thinking(seq: u64, value: impl Into<String>) -> Self {
        Self::new(seq, MessageKind::Thinking, value)
    }

    /// Create a Task message announcing that a task started executing.
    pub fn task_executing(seq: u64, task_id: TaskId, description: impl Into<String>) -> Self {
        Self::new(
            seq,
            MessageKind::Task {
                task_id,
                status: TaskStatus::Executing,
            },
            description,
        )
    }

    /// Create a Task message carrying a completed task's result.
    pub fn task_completed(seq: u64, task_id: TaskId, result: impl Into<String>) -> Self {
        Self::new(
            seq,
            MessageKind::Task {
                task_id,
                status: TaskStatus::Completed,
            },
            result,
        )
    }

    /// Create a SystemNotice message.
    pub fn notice(seq: u64, value: impl Into<String>) -> Self {
        Self::new(seq, MessageKind::SystemNotice, value)
    }

    /// Create an Error message, optionally tied to a task.
    pub fn error(seq: u64, task_id: Option<TaskId>, value: impl Into<String>) -> Self {
        Self::new(seq, MessageKind::Error { task_id }, value)
    }

    /// The task this message refers to, if any.
    pub fn task_id(&self) -> Option<TaskId> {
        match self.kind {
            MessageKind::Task { task_id, .. } => Some(task_id),
            MessageKind::Error { task_id } => task_id,
            _ => None,
        }
    }

    /// Returns true for Task-kind messages.
    pub fn is_task(&self) -> bool {
        matches!(self.kind, MessageKind::Task { .. })
    }

    /// Returns true for Error-kind messages.
    pub fn is_error(&self) -> bool {
        matches!(self.kind, MessageKind::Error { .. })
    }
}
