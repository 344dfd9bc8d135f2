//! Shared error types

use thiserror::Error;

/// Errors surfaced across crate boundaries
#[derive(Error, Debug)]
pub enum Error {
    /// Audio frame does not match the expected format.
    ///
    /// The pipeline treats this as a dropped frame, never as a fatal error.
    #[error("invalid audio format: expected {expected}, got {got}")]
    InvalidAudioFormat { expected: String, got: String },

    #[error("transcription error: {0}")]
    Stt(String),

    #[error("reply generation error: {0}")]
    Llm(String),

    #[error("speech synthesis error: {0}")]
    Tts(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("session error: {0}")]
    Session(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
