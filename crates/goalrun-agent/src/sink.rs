//! Event sinks receiving a run's messages and status changes.

use std::sync::Mutex;

use goalrun_core::{Message, RunStatus};
use tokio::sync::mpsc;
use tracing::trace;

/// Everything a run pushes outward.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Message(Message),
    Status(RunStatus),
}

/// Receiver of a run's progress.
///
/// Both callbacks are fire-and-forget: implementations must return quickly
/// and must not block on rendering or I/O.
pub trait EventSink: Send + Sync {
    /// Called for every emitted message, in emission order.
    fn on_message(&self, message: Message);

    /// Called for every status transition.
    fn on_status_change(&self, status: RunStatus);
}

/// Sink that forwards events over an unbounded channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver for its events.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: RunEvent) {
        // Receiver might be dropped; the run carries on regardless.
        if self.tx.send(event).is_err() {
            trace!("Event receiver dropped");
        }
    }
}

impl EventSink for ChannelSink {
    fn on_message(&self, message: Message) {
        self.forward(RunEvent::Message(message));
    }

    fn on_status_change(&self, status: RunStatus) {
        self.forward(RunEvent::Status(status));
    }
}

/// Sink that keeps every event in memory.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<RunEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events so far, in order.
    pub fn events(&self) -> Vec<RunEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Messages only, in order.
    pub fn messages(&self) -> Vec<Message> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RunEvent::Message(message) => Some(message),
                RunEvent::Status(_) => None,
            })
            .collect()
    }

    /// Status transitions only, in order.
    pub fn statuses(&self) -> Vec<RunStatus> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RunEvent::Status(status) => Some(status),
                RunEvent::Message(_) => None,
            })
            .collect()
    }

    fn record(&self, event: RunEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

impl EventSink for MemorySink {
    fn on_message(&self, message: Message) {
        self.record(RunEvent::Message(message));
    }

    fn on_status_change(&self, status: RunStatus) {
        self.record(RunEvent::Status(status));
    }
}
