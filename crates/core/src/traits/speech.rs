//! Speech processing traits

use crate::{AudioFrame, Result};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Stream of synthesized audio chunks
pub type AudioChunkStream<'a> = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send + 'a>>;

/// Speech-to-Text interface
///
/// Converts a finished utterance into text for the configured spoken
/// language.
///
/// # Example
///
/// ```ignore
/// let stt: Arc<dyn SpeechToText> = Arc::new(GroqStt::new(config, key)?);
/// if let Some(text) = stt.transcribe(&utterance).await? {
///     println!("User said: {}", text);
/// }
/// ```
#[async_trait]
pub trait SpeechToText: Send + Sync + 'static {
    /// Transcribe one utterance
    ///
    /// Returns `Ok(None)` when no speech was recognized *and* on provider
    /// failure (network, auth, quota); the failure is logged here, never
    /// surfaced, and the turn simply ends. `Err` is reserved for malformed
    /// input audio.
    async fn transcribe(&self, audio: &AudioFrame) -> Result<Option<String>>;

    /// Model name for logging
    fn model_name(&self) -> &str;
}

/// Text-to-Speech interface
///
/// Output format (sample rate, channels, bit depth) is fixed by
/// configuration and must be identical for every implementation behind a
/// fallback chain, since downstream emission assumes a single format.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + 'static {
    /// Synthesize text to a lazy stream of audio chunks
    ///
    /// With `streaming` set, implementations should emit chunks as the
    /// provider produces them instead of buffering the whole utterance.
    fn synthesize<'a>(&'a self, text: &'a str, streaming: bool) -> AudioChunkStream<'a>;

    /// Provider name for logging
    fn provider_name(&self) -> &str;
}
