//! Run-loop configuration.

use std::time::Duration;

/// Tunables for the run loop. Model parameters live in
/// [`ModelSettings`](goalrun_llm::ModelSettings) and are never read here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Maximum number of tasks a run executes before giving up.
    pub max_loops: u32,

    /// Attempts per task. A transient failure is retried until this many
    /// attempts have been made; the next failure stops the run.
    pub max_task_attempts: u32,

    /// How many of the most recent completed results go into an
    /// execution prompt.
    pub context_window: usize,

    /// Longest prior result, in characters, quoted in an execution prompt.
    pub context_result_chars: usize,

    /// Delay between tasks in automatic mode.
    pub step_delay: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_loops: 25,
            max_task_attempts: 2,
            context_window: 5,
            context_result_chars: 500,
            step_delay: Duration::ZERO,
        }
    }
}

impl AgentConfig {
    /// Builder method to set the loop limit.
    pub fn with_max_loops(mut self, max_loops: u32) -> Self {
        self.max_loops = max_loops;
        self
    }

    /// Builder method to set attempts per task. Clamped to at least one.
    pub fn with_max_task_attempts(mut self, attempts: u32) -> Self {
        self.max_task_attempts = attempts.max(1);
        self
    }

    /// Builder method to set the prompt context window.
    pub fn with_context_window(mut self, window: usize) -> Self {
        self.context_window = window;
        self
    }

    /// Builder method to set the inter-task delay.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }
}
