//! OpenAI synthesis (fallback provider)

use futures::StreamExt;
use serde::Serialize;
use std::time::Duration;

use laura_config::TtsOpenAiConfig;
use laura_core::{AudioChunkStream, Error, Result, SpeechSynthesizer};

/// OpenAI text-to-speech backend
///
/// The `pcm` response format is PCM16 at 24 kHz, matching the configured
/// output of the primary provider.
pub struct OpenAiTts {
    config: TtsOpenAiConfig,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

impl OpenAiTts {
    pub fn new(
        config: TtsOpenAiConfig,
        timeout_secs: u64,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Tts(e.to_string()))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn speech_url(&self) -> String {
        format!("{}/audio/speech", self.config.endpoint.trim_end_matches('/'))
    }
}

impl SpeechSynthesizer for OpenAiTts {
    fn synthesize<'a>(&'a self, text: &'a str, _streaming: bool) -> AudioChunkStream<'a> {
        Box::pin(async_stream::stream! {
            let request = SpeechRequest {
                model: &self.config.model,
                voice: &self.config.voice,
                input: text,
                response_format: "pcm",
            };

            let response = match self
                .client
                .post(self.speech_url())
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    yield Err(Error::Tts(e.to_string()));
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                yield Err(Error::Tts(format!("HTTP {}: {}", status, error_text)));
                return;
            }

            let mut bytes = response.bytes_stream();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) if chunk.is_empty() => continue,
                    Ok(chunk) => yield Ok(chunk.to_vec()),
                    Err(e) => {
                        yield Err(Error::Tts(e.to_string()));
                        return;
                    }
                }
            }
        })
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_rejected() {
        assert!(OpenAiTts::new(TtsOpenAiConfig::default(), 30, "").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_provider_yields_error_item() {
        let config = TtsOpenAiConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let tts = OpenAiTts::new(config, 1, "sk_test").unwrap();

        let mut stream = tts.synthesize("hola", true);
        match stream.next().await {
            Some(Err(Error::Tts(_))) => {}
            other => panic!("expected Tts error, got {:?}", other.map(|r| r.map(|c| c.len()))),
        }
        assert!(stream.next().await.is_none());
    }
}
