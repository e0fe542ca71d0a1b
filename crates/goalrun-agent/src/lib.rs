//! goalrun agent
//!
//! Takes a natural-language goal, asks a language backend to break it into
//! tasks, then executes the tasks one at a time, streaming typed
//! [`Message`](goalrun_core::Message)s to an [`EventSink`].
//!
//! The caller keeps a [`RunHandle`] and can pause, single-step, resume or
//! stop the run at any time. The loop observes those requests at two
//! checkpoints per task: before dequeuing, and after the result is emitted.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use goalrun_agent::{ChannelSink, Run, RunEvent};
//! use goalrun_llm::ScriptedBackend;
//!
//! async fn party() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Arc::new(
//!         ScriptedBackend::new()
//!             .reply(r#"["Pick a date", "Book a venue"]"#)
//!             .with_default_reply("Done."),
//!     );
//!     let (sink, mut events) = ChannelSink::new();
//!
//!     let handle = Run::new("party", "Plan a birthday party")?.start(backend, Arc::new(sink));
//!
//!     while let Some(event) = events.recv().await {
//!         if let RunEvent::Message(message) = event {
//!             println!("{:?}: {}", message.kind, message.value);
//!         }
//!     }
//!
//!     let report = handle.join().await?;
//!     println!("stopped: {:?}", report.reason);
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod executor;
mod mode;
mod parse;
mod planner;
mod prompt;
mod queue;
mod run;
mod run_loop;
mod sink;

pub use config::AgentConfig;
pub use error::AgentError;
pub use executor::{Execution, TaskExecutor};
pub use mode::{Gate, ModeController, ModeListener};
pub use parse::{parse_execution, parse_task_list, ParseError};
pub use planner::GoalPlanner;
pub use queue::TaskQueue;
pub use run::{Run, RunControl, RunHandle, RunReport};
pub use sink::{ChannelSink, EventSink, MemorySink, RunEvent};

pub use goalrun_core::{Message, MessageKind, Mode, RunSnapshot, RunStatus, StopReason, Task, TaskStatus};
