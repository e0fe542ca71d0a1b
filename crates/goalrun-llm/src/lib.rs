//! Language backend capability for goalrun
//!
//! This crate provides the seam between the agent run loop and whatever
//! produces text: a single async [`LanguageBackend::generate`] call taking a
//! prompt and an opaque [`ModelSettings`] bag.
//!
//! # Example
//!
//! ```rust,no_run
//! use goalrun_llm::{LanguageBackend, ModelSettings, OpenAiBackend, OpenAiConfig};
//!
//! async fn ask() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = OpenAiBackend::new(OpenAiConfig::new("sk-..."))?;
//!     let settings = ModelSettings::default().with_temperature(0.7);
//!
//!     let text = backend.generate("What is 2 + 2?", &settings).await?;
//!     println!("{}", text);
//!     Ok(())
//! }
//! ```

mod backend;
mod error;
mod openai;
mod scripted;
mod settings;

// Re-export main types
pub use backend::LanguageBackend;
pub use error::BackendError;
pub use openai::{OpenAiBackend, OpenAiConfig};
pub use scripted::ScriptedBackend;
pub use settings::ModelSettings;
