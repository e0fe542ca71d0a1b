//! Read-only export of a finished run for the caller to persist.

use serde::{Deserialize, Serialize};

use crate::Task;

/// One task in a [`RunSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotTask {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Snapshot of a completed run: name, goal and tasks in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub name: String,
    pub goal: String,
    pub tasks: Vec<SnapshotTask>,
}

impl RunSnapshot {
    /// Build a snapshot from the completed-task record.
    pub fn new(name: impl Into<String>, goal: impl Into<String>, completed: &[Task]) -> Self {
        Self {
            name: name.into(),
            goal: goal.into(),
            tasks: completed
                .iter()
                .map(|task| SnapshotTask {
                    description: task.description.clone(),
                    result: task.result.clone(),
                })
                .collect(),
        }
    }
}
