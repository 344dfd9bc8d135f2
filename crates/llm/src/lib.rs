//! Reply generation for the Laura SDR agent
//!
//! Wraps Groq's OpenAI-compatible chat-completions API behind the
//! [`laura_core::ReplyGenerator`] trait with streaming token delivery and a
//! per-instance running conversation history.

pub mod backend;

pub use backend::GroqChat;

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}
