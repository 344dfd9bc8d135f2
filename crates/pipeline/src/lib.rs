//! Speech turn pipeline
//!
//! Drives one end-to-end conversational turn per detected utterance:
//! frame-level VAD with hysteresis, transcription of the finished
//! utterance, a sales state machine update, streamed reply generation and
//! streamed synthesis to the session's outbound audio sink. One pipeline
//! instance serves exactly one session.

pub mod orchestrator;
pub mod stt;
pub mod tts;
pub mod vad;

pub use orchestrator::SpeechTurnPipeline;
pub use stt::GroqStt;
pub use tts::{ElevenLabsTts, FallbackSynthesizer, OpenAiTts};
pub use vad::{EnergyVad, VadConfig, VadResult, VadState};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("VAD error: {0}")]
    Vad(String),

    #[error("STT error: {0}")]
    Stt(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("audio error: {0}")]
    Audio(String),

    #[error(transparent)]
    Core(#[from] laura_core::Error),
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        PipelineError::Stt(err.to_string())
    }
}
