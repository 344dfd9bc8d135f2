//! ElevenLabs synthesis (primary provider)

use futures::StreamExt;
use serde::Serialize;
use std::time::Duration;

use laura_config::TtsElevenLabsConfig;
use laura_core::{AudioChunkStream, Error, Result, SpeechSynthesizer};

/// ElevenLabs text-to-speech backend
///
/// Requests raw PCM16 at the configured sample rate so output is format
/// compatible with the fallback provider.
pub struct ElevenLabsTts {
    config: TtsElevenLabsConfig,
    sample_rate: u32,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    use_speaker_boost: bool,
}

impl ElevenLabsTts {
    pub fn new(
        config: TtsElevenLabsConfig,
        sample_rate: u32,
        timeout_secs: u64,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::Config("ElevenLabs API key required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Tts(e.to_string()))?;

        Ok(Self {
            config,
            sample_rate,
            api_key,
            client,
        })
    }

    fn synthesis_url(&self, streaming: bool) -> String {
        let base = self.config.endpoint.trim_end_matches('/');
        let path = if streaming { "/stream" } else { "" };
        format!(
            "{}/v1/text-to-speech/{}{}?optimize_streaming_latency={}&output_format=pcm_{}",
            base,
            self.config.voice_id,
            path,
            self.config.optimize_streaming_latency,
            self.sample_rate
        )
    }
}

impl SpeechSynthesizer for ElevenLabsTts {
    fn synthesize<'a>(&'a self, text: &'a str, streaming: bool) -> AudioChunkStream<'a> {
        Box::pin(async_stream::stream! {
            let request = SynthesisRequest {
                text,
                model_id: &self.config.model,
                voice_settings: VoiceSettings {
                    stability: self.config.stability,
                    similarity_boost: self.config.similarity_boost,
                    style: self.config.style,
                    use_speaker_boost: self.config.use_speaker_boost,
                },
            };

            let response = match self
                .client
                .post(self.synthesis_url(streaming))
                .header("xi-api-key", &self.api_key)
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
        "elevenlabs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_rejected() {
        assert!(ElevenLabsTts::new(TtsElevenLabsConfig::default(), 24000, 30, "").is_err());
    }

    #[test]
    fn test_synthesis_url_shape() {
        let tts =
            ElevenLabsTts::new(TtsElevenLabsConfig::default(), 24000, 30, "el_test").unwrap();

        let url = tts.synthesis_url(true);
        assert!(url.contains("/v1/text-to-speech/"));
        assert!(url.contains("/stream?"));
        assert!(url.contains("output_format=pcm_24000"));

        let url = tts.synthesis_url(false);
        assert!(!url.contains("/stream?"));
    }
}
