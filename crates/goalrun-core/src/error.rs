//! Core domain errors.

use thiserror::Error;

/// Core domain errors for goalrun.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid state transition.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },
}
