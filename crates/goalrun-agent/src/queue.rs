//! Ordered queue of pending tasks plus the completed-task record.

use std::collections::VecDeque;

use goalrun_core::{Task, TaskId, TaskStatus};

/// FIFO queue of pending tasks for one run.
///
/// Task ids are assigned here from a monotonic sequence. A description that
/// is already pending or completed is never enqueued again.
#[derive(Debug)]
pub struct TaskQueue {
    pending: VecDeque<Task>,
    completed: Vec<Task>,
    next_id: TaskId,
}

impl TaskQueue {
    /// Create an empty queue. The first task gets id 1.
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            completed: Vec::new(),
            next_id: TaskId::new(1),
        }
    }

    /// Enqueue a description at the tail. Returns `None` if it was blank or
    /// a duplicate.
    pub fn push(&mut self, description: &str) -> Option<TaskId> {
        let description = description.trim();
        if description.is_empty() || self.is_known(description) {
            return None;
        }
        let id = self.next_id;
        self.next_id = id.next();
        self.pending.push_back(Task::new(id, description));
        Some(id)
    }

    /// Enqueue several descriptions in order, returning the ids of those
    /// actually added.
    pub fn extend<I, S>(&mut self, descriptions: I) -> Vec<TaskId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        descriptions
            .into_iter()
            .filter_map(|d| self.push(d.as_ref()))
            .collect()
    }

    /// Take the oldest pending task.
    pub fn pop(&mut self) -> Option<Task> {
        self.pending.pop_front()
    }

    /// Move a finished task into the completed record.
    pub fn complete(&mut self, task: Task) {
        debug_assert_eq!(task.status, TaskStatus::Completed);
        self.completed.push(task);
    }

    /// Whether a task with this description is pending or completed.
    pub fn is_known(&self, description: &str) -> bool {
        self.pending
            .iter()
            .chain(self.completed.iter())
            .any(|t| t.description == description)
    }

    pub fn pending(&self) -> impl Iterator<Item = &Task> {
        self.pending.iter()
    }

    pub fn completed(&self) -> &[Task] {
        &self.completed
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Consume the queue, returning `(completed, pending)`.
    pub fn into_parts(self) -> (Vec<Task>, Vec<Task>) {
        (self.completed, self.pending.into_iter().collect())
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
