//! The run loop: plans the goal once, then drains the task queue.
//!
//! The loop consults the mode at two checkpoints per task: before dequeuing
//! (checkpoint A, where it may hold in Paused) and after the task's result
//! is emitted (checkpoint B, where only a stop request matters). Backend
//! calls are the only other suspension points, and each is raced against a
//! stop request so a stop abandons the in-flight call.

use std::sync::Arc;

use goalrun_core::{Message, Mode, RunId, RunStatus, StopReason, Task, TaskId};
use goalrun_llm::LanguageBackend;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::AgentConfig;
use crate::executor::TaskExecutor;
use crate::mode::{Gate, ModeListener};
use crate::planner::GoalPlanner;
use crate::queue::TaskQueue;
use crate::run::{Run, RunReport};
use crate::sink::EventSink;

const THINKING: &str = "Thinking...";
const GOAL_COMPLETE: &str = "All tasks completed. Goal complete.";
const STOPPED_BY_REQUEST: &str = "Run stopped by request.";
const ABANDONED: &str = "Run stopped before the task finished.";

pub(crate) struct RunLoop {
    id: RunId,
    name: String,
    goal: String,
    language: String,
    config: AgentConfig,
    planner: GoalPlanner,
    executor: TaskExecutor,
    sink: Arc<dyn EventSink>,
    listener: ModeListener,
    status_tx: watch::Sender<RunStatus>,
    status: RunStatus,
    queue: TaskQueue,
    seq: u64,
    loops: u32,
}

impl RunLoop {
    pub(crate) fn new(
        run: Run,
        backend: Arc<dyn LanguageBackend>,
        sink: Arc<dyn EventSink>,
        listener: ModeListener,
        status_tx: watch::Sender<RunStatus>,
    ) -> Self {
        let Run {
            id,
            name,
            goal,
            language,
            settings,
            config,
            ..
        } = run;
        let settings = Arc::new(settings);

        Self {
            id,
            name,
            goal,
            language,
            planner: GoalPlanner::new(backend.clone(), settings.clone()),
            executor: TaskExecutor::new(backend, settings, &config),
            config,
            sink,
            listener,
            status_tx,
            status: RunStatus::Idle,
            queue: TaskQueue::new(),
            seq: 0,
            loops: 0,
        }
    }

    /// Idle -> Running. Called synchronously by `Run::start`.
    pub(crate) fn begin(&mut self) {
        info!(run = %self.name, run_id = %self.id, goal = %self.goal, "Starting run");
        self.set_status(RunStatus::Running);
    }

    /// Drive the run to Stopped and report how it ended.
    pub(crate) async fn run(mut self) -> RunReport {
        let reason = self.drive().await;
        self.finish(reason)
    }

    async fn drive(&mut self) -> StopReason {
        let goal = self.goal.clone();
        self.emit(|seq| Message::goal(seq, goal));

        if let Some(reason) = self.plan().await {
            return reason;
        }

        loop {
            // Checkpoint A
            if self.queue.is_empty() {
                return StopReason::Completed;
            }
            if self.loops >= self.config.max_loops {
                return StopReason::LoopLimitReached;
            }
            if !self.checkpoint().await {
                return StopReason::StopRequested;
            }

            let Some(task) = self.queue.pop() else {
                continue;
            };
            self.loops += 1;

            if let Some(reason) = self.execute(task).await {
                return reason;
            }

            // Checkpoint B
            if self.listener.stop_requested() {
                return StopReason::StopRequested;
            }

            let delay = self.config.step_delay;
            if !delay.is_zero() && self.listener.mode() == Mode::Automatic {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.listener.stopped() => return StopReason::StopRequested,
                }
            }
        }
    }

    /// Ask the planner for the initial tasks, retrying transient failures.
    /// Returns a stop reason if the run must end here.
    async fn plan(&mut self) -> Option<StopReason> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.emit(|seq| Message::thinking(seq, THINKING));

            let outcome = tokio::select! {
                result = self.planner.plan(&self.goal, &self.language) => Some(result),
                _ = self.listener.stopped() => None,
            };

            match outcome {
                Some(Ok(tasks)) => {
                    let added = self.queue.extend(&tasks);
                    info!(run = %self.name, tasks = added.len(), "Initial tasks queued");
                    self.announce(&added);
                    return None;
                }
                Some(Err(e)) if e.is_transient() && attempt < self.config.max_task_attempts => {
                    warn!(run = %self.name, attempt, error = %e, "Planning failed, retrying");
                    let explanation = format!("Could not plan the goal: {}. Retrying.", e);
                    self.emit(|seq| Message::error(seq, None, explanation));
                }
                Some(Err(e)) => {
                    error!(run = %self.name, attempt, error = %e, "Planning failed");
                    self.emit(|seq| {
                        Message::error(
                            seq,
                            None,
                            format!("Could not plan the goal: {}. Stopping the agent.", e),
                        )
                    });
                    return Some(StopReason::BackendFailure);
                }
                None => {
                    info!(run = %self.name, "Stop requested during planning");
                    return Some(StopReason::StopRequested);
                }
            }
        }
    }

    /// Hold while paused. Returns false if the run must stop.
    async fn checkpoint(&mut self) -> bool {
        loop {
            match self.listener.gate() {
                Gate::Proceed => {
                    if self.status == RunStatus::Paused {
                        self.set_status(RunStatus::Running);
                    }
                    return true;
                }
                Gate::Stop => return false,
                Gate::Hold => {
                    if self.status != RunStatus::Paused {
                        self.set_status(RunStatus::Paused);
                    }
                    if !self.listener.changed().await {
                        warn!(run = %self.name, "Controller dropped while paused, stopping");
                        return false;
                    }
                }
            }
        }
    }

    /// Execute one task, retrying transient failures. Returns a stop reason
    /// if the run must end here.
    async fn execute(&mut self, mut task: Task) -> Option<StopReason> {
        loop {
            task.start();
            info!(
                run = %self.name,
                task_id = %task.id,
                attempt = task.attempts,
                "Executing task"
            );
            self.emit(|seq| Message::task_executing(seq, task.id, task.description.clone()));
            self.emit(|seq| Message::thinking(seq, THINKING));

            let outcome = tokio::select! {
                result = self.executor.execute(
                    &self.goal,
                    &self.language,
                    &task,
                    self.queue.completed(),
                ) => Some(result),
                _ = self.listener.stopped() => None,
            };

            let task_id = task.id;
            match outcome {
                Some(Ok(execution)) => {
                    self.emit(|seq| {
                        Message::task_completed(seq, task_id, execution.result.clone())
                    });
                    task.complete(execution.result);
                    self.queue.complete(task);

                    let added = self.queue.extend(&execution.new_tasks);
                    self.announce(&added);
                    debug!(
                        run = %self.name,
                        task_id = %task_id,
                        proposed = execution.new_tasks.len(),
                        added = added.len(),
                        "Task completed"
                    );
                    return None;
                }
                Some(Err(e)) if e.is_transient() && task.attempts < self.config.max_task_attempts => {
                    warn!(
                        run = %self.name,
                        task_id = %task_id,
                        attempt = task.attempts,
                        error = %e,
                        "Task failed, retrying"
                    );
                    self.emit(|seq| {
                        Message::error(
                            seq,
                            Some(task_id),
                            format!("Error executing \"{}\": {}. Retrying.", task.description, e),
                        )
                    });
                }
                Some(Err(e)) => {
                    error!(
                        run = %self.name,
                        task_id = %task_id,
                        attempt = task.attempts,
                        error = %e,
                        "Task failed, aborting run"
                    );
                    let explanation = format!(
                        "Error executing \"{}\": {}. Stopping the agent.",
                        task.description, e
                    );
                    self.emit(|seq| Message::error(seq, Some(task_id), explanation.clone()));
                    task.fail(explanation);
                    self.queue.complete(task);
                    return Some(StopReason::BackendFailure);
                }
                None => {
                    info!(run = %self.name, task_id = %task_id, "Task abandoned by stop request");
                    self.emit(|seq| Message::error(seq, Some(task_id), ABANDONED));
                    task.fail(ABANDONED);
                    self.queue.complete(task);
                    return Some(StopReason::StopRequested);
                }
            }
        }
    }

    fn finish(mut self, reason: StopReason) -> RunReport {
        let notice = match reason {
            StopReason::Completed => Some(GOAL_COMPLETE.to_string()),
            StopReason::LoopLimitReached => Some(format!(
                "This agent has run out of loops ({}). {} task(s) were left unfinished.",
                self.config.max_loops,
                self.queue.len()
            )),
            StopReason::StopRequested => Some(STOPPED_BY_REQUEST.to_string()),
            // The error message explaining the abort is already out.
            StopReason::BackendFailure => None,
        };
        if let Some(notice) = notice {
            self.emit(|seq| Message::notice(seq, notice));
        }
        self.set_status(RunStatus::Stopped);
        info!(
            run = %self.name,
            reason = ?reason,
            loops = self.loops,
            messages = self.seq,
            "Run stopped"
        );

        let (completed, pending) = self.queue.into_parts();
        RunReport {
            id: self.id,
            name: self.name,
            goal: self.goal,
            status: self.status,
            reason,
            loops: self.loops,
            messages: self.seq,
            completed,
            pending,
        }
    }

    /// Announce newly queued tasks. Queued tasks get no Task message of
    /// their own; their first one is Executing.
    fn announce(&mut self, added: &[TaskId]) {
        if added.is_empty() {
            return;
        }
        let descriptions: Vec<String> = self
            .queue
            .pending()
            .filter(|t| added.contains(&t.id))
            .map(|t| format!("\"{}\"", t.description))
            .collect();
        let notice = format!(
            "Added {} task(s): {}",
            descriptions.len(),
            descriptions.join(", ")
        );
        self.emit(|seq| Message::notice(seq, notice));
    }

    fn emit(&mut self, build: impl FnOnce(u64) -> Message) {
        let message = build(self.seq);
        self.seq += 1;
        debug!(run = %self.name, seq = message.seq, kind = ?message.kind, "Emitting message");
        self.sink.on_message(message);
    }

    fn set_status(&mut self, next: RunStatus) {
        match self.status.transition(next) {
            Ok(status) => {
                debug!(run = %self.name, from = ?self.status, to = ?status, "Status change");
                self.status = status;
                self.status_tx.send_replace(status);
                self.sink.on_status_change(status);
            }
            Err(e) => warn!(run = %self.name, error = %e, "Ignoring invalid status transition"),
        }
    }
}
