//! Task type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{TaskId, TaskStatus};

/// A Task is one discrete unit of work derived from the goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier, unique within the run.
    pub id: TaskId,

    /// What to do.
    pub description: String,

    /// Current task status.
    pub status: TaskStatus,

    /// Result text once completed successfully.
    pub result: Option<String>,

    /// Error text if the task was force-completed after a failure or a stop.
    pub error: Option<String>,

    /// Number of times execution was attempted.
    pub attempts: u32,

    /// When the task was created.
    pub created_at: DateTime<Utc>,

    /// When the task finished (if completed).
    pub finished_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new pending Task.
    pub fn new(id: TaskId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            status: TaskStatus::Pending,
            result: None,
            error: None,
            attempts: 0,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Mark the task as executing. Called once per attempt.
    pub fn start(&mut self) {
        self.status = TaskStatus::Executing;
        self.attempts += 1;
    }

    /// Mark the task as completed with a result.
    pub fn complete(&mut self, result: impl Into<String>) {
        self.status = TaskStatus::Completed;
        self.result = Some(result.into());
        self.error = None;
        self.finished_at = Some(Utc::now());
    }

    /// Force-complete the task with an error. It will never be re-executed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = TaskStatus::Completed;
        self.result = None;
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
    }

    /// Check if the task finished with a result.
    pub fn succeeded(&self) -> bool {
        self.status == TaskStatus::Completed && self.error.is_none()
    }
}
