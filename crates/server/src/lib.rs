//! HTTP control surface and session lifecycle
//!
//! Exposes the call-control REST API (outbound dialing, telephony
//! webhooks, health) and manages one voice session per connected
//! participant: a session binds a fresh speech turn pipeline, sales
//! tracker and dialogue history to a participant identity for the
//! lifetime of the call.

pub mod calls;
pub mod http;
pub mod session;
pub mod state;
pub mod twilio;

pub use calls::OutboundCallService;
pub use http::create_router;
pub use session::{Session, SessionManager};
pub use state::AppState;

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] laura_config::ConfigError),

    #[error("media provider error: {0}")]
    Media(String),

    #[error("access token error: {0}")]
    Token(String),

    #[error("session error: {0}")]
    Session(String),

    #[error(transparent)]
    Core(#[from] laura_core::Error),
}

impl From<reqwest::Error> for ServerError {
    fn from(err: reqwest::Error) -> Self {
        ServerError::Media(err.to_string())
    }
}

impl From<laura_llm::LlmError> for ServerError {
    fn from(err: laura_llm::LlmError) -> Self {
        ServerError::Session(err.to_string())
    }
}
