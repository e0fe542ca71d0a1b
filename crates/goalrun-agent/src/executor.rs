//! Task executor: runs one task through the backend.

use std::sync::Arc;

use goalrun_core::Task;
use goalrun_llm::{BackendError, LanguageBackend, ModelSettings};
use tracing::debug;

use crate::config::AgentConfig;
use crate::parse::parse_execution;
use crate::prompt::execute_prompt;

/// Outcome of executing one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Human-readable result.
    pub result: String,
    /// Follow-on task descriptions proposed by the backend. Not yet
    /// deduplicated against the run's queue.
    pub new_tasks: Vec<String>,
}

/// Executes single tasks against the backend.
///
/// Exactly one backend call per [`execute`](Self::execute); retrying is the
/// run loop's decision.
pub struct TaskExecutor {
    backend: Arc<dyn LanguageBackend>,
    settings: Arc<ModelSettings>,
    context_window: usize,
    context_result_chars: usize,
}

impl TaskExecutor {
    pub fn new(
        backend: Arc<dyn LanguageBackend>,
        settings: Arc<ModelSettings>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            backend,
            settings,
            context_window: config.context_window,
            context_result_chars: config.context_result_chars,
        }
    }

    /// Execute `task` in the context of `goal` and the tasks completed so far.
    pub async fn execute(
        &self,
        goal: &str,
        language: &str,
        task: &Task,
        completed: &[Task],
    ) -> Result<Execution, BackendError> {
        let prompt = execute_prompt(
            goal,
            language,
            task,
            completed,
            self.context_window,
            self.context_result_chars,
        );
        debug!(
            task_id = %task.id,
            prompt_len = prompt.len(),
            backend = self.backend.name(),
            "Executing task"
        );

        let reply = self.backend.generate(&prompt, &self.settings).await?;
        let execution = parse_execution(&reply);
        debug!(
            task_id = %task.id,
            result_len = execution.result.len(),
            proposed = execution.new_tasks.len(),
            "Task executed"
        );
        Ok(execution)
    }
}
