//! Capability traits for pluggable providers

mod llm;
mod speech;

pub use llm::{ReplyGenerator, ReplyStream};
pub use speech::{AudioChunkStream, SpeechSynthesizer, SpeechToText};
