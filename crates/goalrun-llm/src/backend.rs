//! The language backend trait.

use async_trait::async_trait;

use crate::error::BackendError;
use crate::settings::ModelSettings;

/// A text-generation capability: given a prompt, produce text.
///
/// Implementations must be safe to call concurrently from independent runs
/// and must not keep conversation state between calls.
#[async_trait]
pub trait LanguageBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str, settings: &ModelSettings)
        -> Result<String, BackendError>;
}
