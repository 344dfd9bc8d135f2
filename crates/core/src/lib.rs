//! Core traits and types for the Laura SDR voice agent
//!
//! This crate provides foundational types used across all other crates:
//! - Capability traits for pluggable providers (STT, TTS, reply generation)
//! - Audio frame types and PCM utilities
//! - Dialogue history types
//! - Error types

pub mod audio;
pub mod conversation;
pub mod error;
pub mod llm_types;
pub mod traits;

pub use audio::{AudioBuffer, AudioFrame, Channels, SampleRate};
pub use conversation::{DialogueHistory, Turn, TurnRole};
pub use error::{Error, Result};
pub use llm_types::{Message, Role};
pub use traits::{AudioChunkStream, ReplyGenerator, ReplyStream, SpeechSynthesizer, SpeechToText};
