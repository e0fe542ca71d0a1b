//! Error types for language backends.

use thiserror::Error;

/// Errors a language backend can return.
///
/// Callers retry `Transient` errors; `Fatal` errors abort whatever the
/// caller was doing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Rate limit, timeout, connection reset, server overload.
    #[error("Transient backend error: {0}")]
    Transient(String),

    /// Authentication failure, invalid request, unusable response.
    #[error("Fatal backend error: {0}")]
    Fatal(String),
}

impl BackendError {
    /// Returns true if the call may succeed when retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = format!("HTTP {}: {}", status, detail.into());
        match status {
            408 | 409 | 425 | 429 | 500..=599 => Self::Transient(detail),
            _ => Self::Fatal(detail),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), err.to_string());
        }
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::Transient(err.to_string())
        } else {
            Self::Fatal(err.to_string())
        }
    }
}
