//! Configuration management for the Laura SDR voice agent
//!
//! Supports loading configuration from:
//! - YAML files (`config/default.yaml`, `config/{env}.yaml`)
//! - Environment variables (`LAURA__` prefix, `__` separator)
//!
//! Provider credentials are read from the conventional environment
//! variables (`GROQ_API_KEY`, `ELEVENLABS_API_KEY`, `OPENAI_API_KEY`,
//! `LIVEKIT_API_KEY`, `LIVEKIT_API_SECRET`). Missing credentials fail
//! validation, and therefore process startup, never the first call.

pub mod settings;

pub use settings::{
    load_settings, AgentConfig, CredentialsConfig, LlmConfig, MediaConfig, ServerConfig, Settings,
    SttConfig, TtsConfig, TtsElevenLabsConfig, TtsOpenAiConfig, VadSettings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required credential: {0}")]
    MissingCredential(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
