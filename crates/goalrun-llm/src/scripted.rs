//! In-memory backend with canned replies.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use crate::backend::LanguageBackend;
use crate::error::BackendError;
use crate::settings::ModelSettings;

/// A backend that replays queued replies in order.
///
/// When the queue is empty it answers with the default reply, or a fatal
/// error if none was set. Every prompt is recorded. Useful for offline runs
/// and for tests.
///
/// # Example
///
/// ```rust
/// use goalrun_llm::{BackendError, ScriptedBackend};
///
/// let backend = ScriptedBackend::new()
///     .reply("1. Pick a date\n2. Book a venue")
///     .fail(BackendError::Transient("rate limited".into()))
///     .with_default_reply("Done.");
/// ```
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, BackendError>>>,
    default_reply: Option<String>,
    prompts: Mutex<Vec<String>>,
    latency: Option<Duration>,
}

impl ScriptedBackend {
    /// Create an empty script.
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            default_reply: None,
            prompts: Mutex::new(Vec::new()),
            latency: None,
        }
    }

    /// Queue a successful reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue a failure.
    pub fn fail(self, error: BackendError) -> Self {
        self.push(Err(error));
        self
    }

    /// Reply used once the queue is exhausted.
    pub fn with_default_reply(mut self, text: impl Into<String>) -> Self {
        self.default_reply = Some(text.into());
        self
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Append a reply or failure to the queue.
    pub fn push(&self, reply: Result<String, BackendError>) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    /// All prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        prompt: &str,
        _settings: &ModelSettings,
    ) -> Result<String, BackendError> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let next = self
            .replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        trace!(queued = next.is_some(), "Scripted backend call");

        match next {
            Some(reply) => reply,
            None => self
                .default_reply
                .clone()
                .ok_or_else(|| BackendError::Fatal("script exhausted".to_string())),
        }
    }
}
