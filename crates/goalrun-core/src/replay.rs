//! Rebuild task history from a message stream.

use serde::{Deserialize, Serialize};

use crate::{Message, MessageKind, TaskId, TaskStatus};

/// A task as reconstructed from messages alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub description: String,
    pub status: TaskStatus,
    pub result: Option<String>,
    pub error: Option<String>,
    pub attempts: u32,
}

/// Replay messages in order and return every task they mention, in order of
/// first execution.
///
/// An Error tied to an executing task force-completes it; a later Executing
/// message for the same id (a retry) reopens it. The output depends only on
/// the message order, never on when the messages were consumed.
pub fn replay(messages: &[Message]) -> Vec<TaskRecord> {
    let mut records: Vec<TaskRecord> = Vec::new();

    for message in messages {
        match message.kind {
            MessageKind::Task {
                task_id,
                status: TaskStatus::Executing,
            } => match records.iter_mut().find(|r| r.id == task_id) {
                Some(record) => {
                    record.status = TaskStatus::Executing;
                    record.error = None;
                    record.attempts += 1;
                }
                None => records.push(TaskRecord {
                    id: task_id,
                    description: message.value.clone(),
                    status: TaskStatus::Executing,
                    result: None,
                    error: None,
                    attempts: 1,
                }),
            },
            MessageKind::Task {
                task_id,
                status: TaskStatus::Completed,
            } => {
                if let Some(record) = records.iter_mut().find(|r| r.id == task_id) {
                    record.status = TaskStatus::Completed;
                    record.result = Some(message.value.clone());
                    record.error = None;
                }
            }
            MessageKind::Error {
                task_id: Some(task_id),
            } => {
                if let Some(record) = records
                    .iter_mut()
                    .find(|r| r.id == task_id && r.status == TaskStatus::Executing)
                {
                    record.status = TaskStatus::Completed;
                    record.error = Some(message.value.clone());
                }
            }
            _ => {}
        }
    }

    records
}
