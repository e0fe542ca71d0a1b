//! Mode and status enums for Runs and Tasks.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Status of a single Task within a Run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task is queued and waiting to be executed.
    #[default]
    Pending,
    /// Task is the one currently being executed.
    Executing,
    /// Task finished, either with a result or force-completed with an error.
    Completed,
}

/// Life-cycle status of a Run. Owned exclusively by the run loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Run created but not yet started.
    #[default]
    Idle,
    /// Run loop is advancing.
    Running,
    /// Run loop is holding at a checkpoint, waiting for a step or resume.
    Paused,
    /// Run has ended. Terminal.
    Stopped,
}

impl RunStatus {
    /// Returns true if the run is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Returns true if the run is still active (not terminal).
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether the life-cycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Paused)
                | (Self::Paused, Self::Running)
                | (Self::Running, Self::Stopped)
                | (Self::Paused, Self::Stopped)
        )
    }

    /// Validate a transition, returning the new status.
    pub fn transition(&self, next: RunStatus) -> Result<RunStatus, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidStateTransition {
                from: format!("{:?}", self),
                to: format!("{:?}", next),
            })
        }
    }
}

/// Caller-controlled mode deciding how the run loop advances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    /// Loop self-advances without waiting.
    #[default]
    Automatic,
    /// Loop executes at most one task per step signal.
    Pause,
    /// Loop exits at the next checkpoint.
    StopRequested,
}

impl Mode {
    /// StopRequested is sticky: once set, no other mode may replace it.
    pub fn can_change_to(&self, next: Mode) -> bool {
        !matches!(self, Self::StopRequested) || next == Self::StopRequested
    }
}

/// Why a run reached Stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The queue drained; the goal is complete.
    Completed,
    /// The run executed its maximum number of tasks.
    LoopLimitReached,
    /// The caller requested a stop.
    StopRequested,
    /// The backend failed in a way the loop could not recover from.
    BackendFailure,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::LoopLimitReached => "loop_limit_reached",
            Self::StopRequested => "stop_requested",
            Self::BackendFailure => "backend_failure",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
