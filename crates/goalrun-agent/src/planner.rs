//! Goal planner: turns a goal into the initial task list.

use std::sync::Arc;

use goalrun_llm::{BackendError, LanguageBackend, ModelSettings};
use tracing::{debug, info};

use crate::parse::parse_task_list;
use crate::prompt::plan_prompt;

/// Asks the backend to decompose a goal into tasks.
pub struct GoalPlanner {
    backend: Arc<dyn LanguageBackend>,
    settings: Arc<ModelSettings>,
}

impl GoalPlanner {
    pub fn new(backend: Arc<dyn LanguageBackend>, settings: Arc<ModelSettings>) -> Self {
        Self { backend, settings }
    }

    /// Plan `goal`, returning at least one task description.
    ///
    /// Exactly one backend call; retrying is the run loop's decision. An
    /// unparsable or empty reply yields a single task equal to the goal.
    pub async fn plan(&self, goal: &str, language: &str) -> Result<Vec<String>, BackendError> {
        let prompt = plan_prompt(goal, language);
        debug!(backend = self.backend.name(), prompt_len = prompt.len(), "Planning goal");
        let reply = self.backend.generate(&prompt, &self.settings).await?;

        let tasks = match parse_task_list(&reply) {
            Ok(tasks) if !tasks.is_empty() => tasks,
            Ok(_) => {
                debug!("Planner returned no tasks, falling back to the goal");
                vec![goal.to_string()]
            }
            Err(e) => {
                debug!(error = %e, "Unparsable plan, falling back to the goal");
                vec![goal.to_string()]
            }
        };

        info!(task_count = tasks.len(), "Goal planned");
        Ok(tasks)
    }
}
