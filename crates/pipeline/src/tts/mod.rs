//! Speech synthesis providers and fallback chain
//!
//! Two hosted providers produce the same configured PCM16 output format,
//! so chunks from either can be emitted downstream interchangeably.

mod elevenlabs;
mod openai;

pub use elevenlabs::ElevenLabsTts;
pub use openai::OpenAiTts;

use futures::StreamExt;
use std::sync::Arc;

use laura_core::{AudioChunkStream, SpeechSynthesizer};

/// Ordered synthesis provider chain
///
/// Tries providers in order. A failure at any point, including mid-stream,
/// abandons that provider and restarts the entire text against the next
/// one. When the last provider fails the stream ends silently; synthesis
/// errors are logged, never surfaced to the turn.
pub struct FallbackSynthesizer {
    providers: Vec<Arc<dyn SpeechSynthesizer>>,
}

impl FallbackSynthesizer {
    pub fn new(providers: Vec<Arc<dyn SpeechSynthesizer>>) -> Self {
        Self { providers }
    }
}

impl SpeechSynthesizer for FallbackSynthesizer {
    fn synthesize<'a>(&'a self, text: &'a str, streaming: bool) -> AudioChunkStream<'a> {
        Box::pin(async_stream::stream! {
            for provider in &self.providers {
                let mut failed = false;
                let mut chunks = provider.synthesize(text, streaming);

                while let Some(item) = chunks.next().await {
                    match item {
                        Ok(chunk) => yield Ok(chunk),
                        Err(e) => {
                            tracing::warn!(
                                provider = provider.provider_name(),
                                error = %e,
                                "Synthesis failed, advancing to next provider"
                            );
                            failed = true;
                            break;
                        }
                    }
                }

                if !failed {
                    return;
                }
            }

            tracing::error!(text_chars = text.len(), "All synthesis providers failed");
        })
    }

    fn provider_name(&self) -> &str {
        "fallback-chain"
    }
}

// Needs an async executor; exercised further in the crate's integration tests
#[cfg(test)]
mod tests {
    use super::*;
    use laura_core::Error;

    struct FixedTts {
        name: &'static str,
        chunks: Vec<Vec<u8>>,
        fail_after: Option<usize>,
    }

    impl SpeechSynthesizer for FixedTts {
        fn synthesize<'a>(&'a self, _text: &'a str, _streaming: bool) -> AudioChunkStream<'a> {
            Box::pin(async_stream::stream! {
                for (i, chunk) in self.chunks.iter().enumerate() {
                    if self.fail_after == Some(i) {
                        yield Err(Error::Tts("provider down".to_string()));
                        return;
                    }
                    yield Ok(chunk.clone());
                }
            })
        }

        fn provider_name(&self) -> &str {
            self.name
        }
    }

    async fn collect(stream: AudioChunkStream<'_>) -> Vec<Vec<u8>> {
        stream.filter_map(|item| async { item.ok() }).collect().await
    }

    #[tokio::test]
    async fn test_primary_success_never_touches_fallback() {
        let chain = FallbackSynthesizer::new(vec![
            Arc::new(FixedTts {
                name: "primary",
                chunks: vec![vec![1], vec![2]],
                fail_after: None,
            }),
            Arc::new(FixedTts {
                name: "fallback",
                chunks: vec![vec![9]],
                fail_after: None,
            }),
        ]);

        let chunks = collect(chain.synthesize("hola", true)).await;
        assert_eq!(chunks, vec![vec![1], vec![2]]);
    }

    #[tokio::test]
    async fn test_failing_primary_restarts_on_fallback() {
        let chain = FallbackSynthesizer::new(vec![
            Arc::new(FixedTts {
                name: "primary",
                chunks: vec![vec![1]],
                fail_after: Some(0),
            }),
            Arc::new(FixedTts {
                name: "fallback",
                chunks: vec![vec![9], vec![8]],
                fail_after: None,
            }),
        ]);

        // Primary fails before its first chunk: output is purely fallback
        let chunks = collect(chain.synthesize("hola", true)).await;
        assert_eq!(chunks, vec![vec![9], vec![8]]);
    }

    #[tokio::test]
    async fn test_all_providers_failing_ends_silently() {
        let chain = FallbackSynthesizer::new(vec![
            Arc::new(FixedTts {
                name: "primary",
                chunks: vec![vec![1]],
                fail_after: Some(0),
            }),
            Arc::new(FixedTts {
                name: "fallback",
                chunks: vec![vec![9]],
                fail_after: Some(0),
            }),
        ]);

        let mut stream = chain.synthesize("hola", true);
        // No Ok chunks and no Err items reach the consumer
        while let Some(item) = stream.next().await {
            panic!("unexpected item: {:?}", item.map(|c| c.len()));
        }
    }

    #[tokio::test]
    async fn test_mid_stream_failure_switches_provider() {
        let chain = FallbackSynthesizer::new(vec![
            Arc::new(FixedTts {
                name: "primary",
                chunks: vec![vec![1], vec![2], vec![3]],
                fail_after: Some(1),
            }),
            Arc::new(FixedTts {
                name: "fallback",
                chunks: vec![vec![9]],
                fail_after: None,
            }),
        ]);

        // First chunk was already emitted, then the full text restarts
        let chunks = collect(chain.synthesize("hola", true)).await;
        assert_eq!(chunks, vec![vec![1], vec![9]]);
    }
}
