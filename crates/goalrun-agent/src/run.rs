//! Caller control surface: create a run, start it, steer it, collect it.

use std::sync::Arc;

use goalrun_core::{Mode, RunId, RunSnapshot, RunStatus, StopReason, Task};
use goalrun_llm::{LanguageBackend, ModelSettings};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::mode::ModeController;
use crate::run_loop::RunLoop;
use crate::sink::EventSink;

/// A run that has not started yet (status Idle).
///
/// Starting consumes it, so a run can never be restarted in place; retrying
/// means building a new `Run`.
#[derive(Debug, Clone)]
pub struct Run {
    pub(crate) id: RunId,
    pub(crate) name: String,
    pub(crate) goal: String,
    pub(crate) language: String,
    pub(crate) settings: ModelSettings,
    pub(crate) config: AgentConfig,
    pub(crate) mode: Mode,
}

impl Run {
    /// Create a run. Fails with `InvalidInput` if the name or goal is blank.
    pub fn new(name: impl Into<String>, goal: impl Into<String>) -> Result<Self, AgentError> {
        let name = name.into().trim().to_string();
        let goal = goal.into().trim().to_string();
        if name.is_empty() {
            return Err(AgentError::InvalidInput("name must not be empty".to_string()));
        }
        if goal.is_empty() {
            return Err(AgentError::InvalidInput("goal must not be empty".to_string()));
        }

        Ok(Self {
            id: RunId::generate(),
            name,
            goal,
            language: "English".to_string(),
            settings: ModelSettings::default(),
            config: AgentConfig::default(),
            mode: Mode::Automatic,
        })
    }

    /// Builder method to set the response language hint.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        if !language.trim().is_empty() {
            self.language = language.trim().to_string();
        }
        self
    }

    /// Builder method to set the model settings forwarded to the backend.
    pub fn with_settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Builder method to set run-loop tunables.
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Builder method to set the mode the run starts in.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn status(&self) -> RunStatus {
        RunStatus::Idle
    }

    /// Start the run on the current tokio runtime.
    ///
    /// The status is Running by the time this returns.
    pub fn start(self, backend: Arc<dyn LanguageBackend>, sink: Arc<dyn EventSink>) -> RunHandle {
        let id = self.id.clone();
        let name = self.name.clone();
        let (controller, listener) = ModeController::new(self.mode);
        let (status_tx, status_rx) = watch::channel(RunStatus::Idle);

        let mut run_loop = RunLoop::new(self, backend, sink, listener, status_tx);
        run_loop.begin();
        let join = tokio::spawn(run_loop.run());

        RunHandle {
            id,
            name,
            control: RunControl {
                controller: Arc::new(controller),
                status: status_rx,
            },
            join,
        }
    }
}

/// Cloneable control surface of a started run.
#[derive(Debug, Clone)]
pub struct RunControl {
    controller: Arc<ModeController>,
    status: watch::Receiver<RunStatus>,
}

impl RunControl {
    /// Current status as last published by the run loop.
    pub fn status(&self) -> RunStatus {
        *self.status.borrow()
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.controller.mode()
    }

    /// Change the mode. Takes effect at the loop's next checkpoint.
    pub fn set_mode(&self, mode: Mode) -> Result<(), AgentError> {
        if self.status().is_terminal() || !self.controller.set_mode(mode) {
            return Err(AgentError::RunStopped);
        }
        Ok(())
    }

    /// Authorize exactly one more task while paused. Returns whether the
    /// request was accepted; it is ignored outside Pause mode.
    pub fn request_step(&self) -> Result<bool, AgentError> {
        if self.status().is_terminal() || self.controller.mode() == Mode::StopRequested {
            return Err(AgentError::RunStopped);
        }
        Ok(self.controller.request_step())
    }

    /// Request a stop. Idempotent.
    pub fn stop(&self) {
        self.controller.stop();
    }

    /// Wait until the run reaches `target` or stops, returning the status
    /// actually reached.
    pub async fn wait_for_status(&self, target: RunStatus) -> RunStatus {
        let mut status = self.status.clone();
        status
            .wait_for(|s| *s == target || s.is_terminal())
            .await
            .map(|s| *s)
            .unwrap_or(RunStatus::Stopped)
    }
}

/// Handle to a started run.
#[derive(Debug)]
pub struct RunHandle {
    id: RunId,
    name: String,
    control: RunControl,
    join: JoinHandle<RunReport>,
}

impl RunHandle {
    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A cloneable control surface, e.g. for an input task.
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    pub fn status(&self) -> RunStatus {
        self.control.status()
    }

    pub fn mode(&self) -> Mode {
        self.control.mode()
    }

    pub fn set_mode(&self, mode: Mode) -> Result<(), AgentError> {
        self.control.set_mode(mode)
    }

    pub fn request_step(&self) -> Result<bool, AgentError> {
        self.control.request_step()
    }

    pub fn stop(&self) {
        self.control.stop();
    }

    pub async fn wait_for_status(&self, target: RunStatus) -> RunStatus {
        self.control.wait_for_status(target).await
    }

    /// Wait for the run to stop and return its report.
    pub async fn join(self) -> Result<RunReport, AgentError> {
        Ok(self.join.await?)
    }
}

/// Final state of a run, available once it has stopped.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub id: RunId,
    pub name: String,
    pub goal: String,
    /// Always `Stopped`.
    pub status: RunStatus,
    pub reason: StopReason,
    /// Tasks dequeued for execution.
    pub loops: u32,
    /// Messages emitted.
    pub messages: u64,
    /// Completed tasks in execution order, including force-completed ones.
    pub completed: Vec<Task>,
    /// Tasks still queued when the run stopped.
    pub pending: Vec<Task>,
}

impl RunReport {
    /// Persistence snapshot, available only when the run completed its goal.
    pub fn snapshot(&self) -> Option<RunSnapshot> {
        match self.reason {
            StopReason::Completed => Some(RunSnapshot::new(&self.name, &self.goal, &self.completed)),
            _ => None,
        }
    }
}
