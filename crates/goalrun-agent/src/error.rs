//! Errors surfaced to the caller of the agent.

use thiserror::Error;

/// Errors that can occur when creating or controlling a run.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Empty or blank name/goal. No run is created.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The run already reached Stopped and can no longer be controlled.
    #[error("Run has stopped")]
    RunStopped,

    /// The run loop task panicked or was cancelled by the runtime.
    #[error("Run loop task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
