//! Mode controller: how caller requests reach the run loop.
//!
//! The caller holds a [`ModeController`]; the run loop holds the matching
//! [`ModeListener`]. Requests travel over a `watch` channel and are only
//! acted on when the loop reaches a checkpoint.

use goalrun_core::Mode;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Control {
    mode: Mode,
    /// Bumped by every accepted step request.
    step: u64,
}

/// Caller side of the mode state machine.
#[derive(Debug)]
pub struct ModeController {
    tx: watch::Sender<Control>,
}

/// Loop side of the mode state machine.
#[derive(Debug)]
pub struct ModeListener {
    rx: watch::Receiver<Control>,
    seen_step: u64,
}

/// Outcome of evaluating the mode at a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Execute the next task.
    Proceed,
    /// Paused with no step pending. Wait for a change.
    Hold,
    /// Exit the loop.
    Stop,
}

impl ModeController {
    /// Create a controller/listener pair starting in `initial`.
    pub fn new(initial: Mode) -> (Self, ModeListener) {
        let (tx, rx) = watch::channel(Control {
            mode: initial,
            step: 0,
        });
        (Self { tx }, ModeListener { rx, seen_step: 0 })
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.tx.borrow().mode
    }

    /// Change the mode. Returns false if refused because a stop was
    /// already requested.
    pub fn set_mode(&self, mode: Mode) -> bool {
        let mut accepted = true;
        self.tx.send_if_modified(|control| {
            if !control.mode.can_change_to(mode) {
                accepted = false;
                return false;
            }
            if control.mode == mode {
                return false;
            }
            control.mode = mode;
            true
        });
        debug!(mode = ?mode, accepted, "Mode change requested");
        accepted
    }

    /// Authorize one more task while paused. Ignored in any other mode.
    /// Requests that arrive before the loop consumes the previous one
    /// collapse into a single step.
    pub fn request_step(&self) -> bool {
        self.tx.send_if_modified(|control| {
            if control.mode != Mode::Pause {
                return false;
            }
            control.step = control.step.wrapping_add(1);
            true
        })
    }

    /// Request that the loop exits at its next checkpoint.
    pub fn stop(&self) {
        self.set_mode(Mode::StopRequested);
    }
}

impl ModeListener {
    /// Evaluate the mode at a checkpoint, consuming a pending step if the
    /// run is paused.
    pub fn gate(&mut self) -> Gate {
        let control = *self.rx.borrow_and_update();
        match control.mode {
            Mode::StopRequested => Gate::Stop,
            Mode::Automatic => {
                // Steps only count while paused.
                self.seen_step = control.step;
                Gate::Proceed
            }
            Mode::Pause if control.step != self.seen_step => {
                self.seen_step = control.step;
                Gate::Proceed
            }
            Mode::Pause => Gate::Hold,
        }
    }

    /// Current mode without consuming anything.
    pub fn mode(&self) -> Mode {
        self.rx.borrow().mode
    }

    pub fn stop_requested(&self) -> bool {
        self.mode() == Mode::StopRequested
    }

    /// Wait for the caller to change something. Returns false if the
    /// controller was dropped, after which nothing can ever change.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Resolve once a stop is requested. Never resolves if the controller
    /// is dropped without requesting one.
    pub async fn stopped(&mut self) {
        let outcome = self
            .rx
            .wait_for(|control| control.mode == Mode::StopRequested)
            .await
            .map(|_| ());
        if outcome.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
