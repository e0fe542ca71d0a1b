//! goalrun Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - The async runtime
//! - Any particular language backend
//!
//! All types here describe a single agent run: its tasks, the modes and
//! statuses that drive it, and the append-only message stream it emits.

pub mod error;
pub mod ids;
pub mod message;
pub mod replay;
pub mod snapshot;
pub mod status;
pub mod task;

// Re-export commonly used types
pub use error::CoreError;
pub use ids::{RunId, TaskId};
pub use message::{Message, MessageKind};
pub use replay::{replay, TaskRecord};
pub use snapshot::{RunSnapshot, SnapshotTask};
pub use status::{Mode, RunStatus, StopReason, TaskStatus};
pub use task::Task;
