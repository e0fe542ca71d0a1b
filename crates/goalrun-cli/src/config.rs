//! Arguments for `goalrun run` and their mapping onto run configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use goalrun_agent::{AgentConfig, Mode};
use goalrun_llm::{ModelSettings, OpenAiConfig};

/// Arguments of the `run` subcommand.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Display name of the run
    #[arg(short, long)]
    pub name: String,

    /// Goal the agent should pursue
    #[arg(short, long)]
    pub goal: String,

    /// Response language, as a name ("German") or a short code ("de")
    #[arg(short, long, default_value = "en")]
    pub language: String,

    /// Model name passed to the backend
    #[arg(short, long)]
    pub model: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum tokens per backend reply
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Maximum number of tasks executed before the run gives up
    #[arg(long, default_value_t = 25)]
    pub max_loops: u32,

    /// Attempts per task before a transient failure stops the run
    #[arg(long, default_value_t = 2)]
    pub max_task_attempts: u32,

    /// Pause between tasks in automatic mode, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub step_delay_ms: u64,

    /// Start paused; advance with `s`, resume with `r`
    #[arg(long)]
    pub pause: bool,

    /// Print events as JSON lines instead of text
    #[arg(long)]
    pub json: bool,

    /// Write the run snapshot to this file when the goal completes
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Use a canned offline backend instead of the HTTP API
    #[arg(long)]
    pub offline: bool,

    /// API key for the OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub base_url: Option<String>,

    /// Backend request timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,
}

impl RunArgs {
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig::default()
            .with_max_loops(self.max_loops)
            .with_max_task_attempts(self.max_task_attempts)
            .with_step_delay(Duration::from_millis(self.step_delay_ms))
    }

    pub fn model_settings(&self) -> ModelSettings {
        let mut settings = ModelSettings::default();
        if let Some(model) = &self.model {
            settings = settings.with_model(model.clone());
        }
        if let Some(temperature) = self.temperature {
            settings = settings.with_temperature(temperature);
        }
        if let Some(tokens) = self.max_tokens {
            settings = settings.with_max_tokens(tokens);
        }
        settings
    }

    pub fn initial_mode(&self) -> Mode {
        if self.pause {
            Mode::Pause
        } else {
            Mode::Automatic
        }
    }

    /// Backend connection settings. `None` when no API key is available.
    pub fn openai_config(&self) -> Option<OpenAiConfig> {
        let key = self.api_key.as_deref().filter(|k| !k.trim().is_empty())?;
        let mut config =
            OpenAiConfig::new(key).with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url.clone());
        }
        if let Some(model) = &self.model {
            config = config.with_default_model(model.clone());
        }
        Some(config)
    }

    pub fn language_name(&self) -> String {
        language_name(&self.language)
    }
}

/// Expand a short language code to the name used in prompts. Anything
/// unrecognised is passed through.
pub fn language_name(code: &str) -> String {
    let name = match code.trim().to_lowercase().as_str() {
        "en" => "English",
        "de" => "German",
        "fr" => "French",
        "es" => "Spanish",
        "it" => "Italian",
        "pt" => "Portuguese",
        "nl" => "Dutch",
        "pl" => "Polish",
        "ru" => "Russian",
        "ja" => "Japanese",
        "zh" => "Chinese",
        "ko" => "Korean",
        _ => return code.trim().to_string(),
    };
    name.to_string()
}
