//! Groq Whisper transcription
//!
//! Uploads the finished utterance as a WAV file to Groq's
//! OpenAI-compatible transcription endpoint. Provider failures are logged
//! and reported as "nothing recognized" so a flaky provider degrades to
//! dropped turns instead of dropped calls.

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use std::time::Duration;

use laura_config::SttConfig;
use laura_core::{AudioFrame, Error, Result, SpeechToText};

use crate::PipelineError;

/// Utterances shorter than this carry no usable speech
const MIN_UTTERANCE_MS: u64 = 100;

/// Groq Whisper speech-to-text backend
pub struct GroqStt {
    config: SttConfig,
    api_key: String,
    language: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl GroqStt {
    pub fn new(
        config: SttConfig,
        api_key: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::Config("STT API key required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Stt(e.to_string()))?;

        Ok(Self {
            config,
            api_key,
            language: language.into(),
            client,
        })
    }

    fn transcription_url(&self) -> String {
        format!(
            "{}/audio/transcriptions",
            self.config.endpoint.trim_end_matches('/')
        )
    }

    async fn request_transcription(&self, wav: Vec<u8>) -> Result<String, PipelineError> {
        let file_part = multipart::Part::bytes(wav)
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| PipelineError::Stt(e.to_string()))?;

        let form = multipart::Form::new()
            .part("file", file_part)
            .text("model", self.config.model.clone())
            .text("language", self.language.clone())
            .text("response_format", "json");

        let response = self
            .client
            .post(self.transcription_url())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Stt(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Stt(e.to_string()))?;

        Ok(body.text)
    }
}

#[async_trait]
impl SpeechToText for GroqStt {
    async fn transcribe(&self, audio: &AudioFrame) -> Result<Option<String>> {
        if audio.samples.is_empty() {
            return Err(Error::InvalidAudioFormat {
                expected: "non-empty utterance".to_string(),
                got: "0 samples".to_string(),
            });
        }
        if audio.duration_ms() < MIN_UTTERANCE_MS {
            tracing::debug!(
                duration_ms = audio.duration_ms(),
                "Utterance too short to transcribe"
            );
            return Ok(None);
        }

        let wav = audio.to_wav();
        if wav.is_empty() {
            return Err(Error::InvalidAudioFormat {
                expected: "encodable PCM16 utterance".to_string(),
                got: "unencodable samples".to_string(),
            });
        }

        match self.request_transcription(wav).await {
            Ok(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    tracing::debug!("Transcription returned no speech");
                    Ok(None)
                } else {
                    tracing::info!(
                        model = %self.config.model,
                        chars = text.len(),
                        "Utterance transcribed"
                    );
                    Ok(Some(text))
                }
            }
            Err(e) => {
                // Provider failure ends the turn, never the call
                tracing::error!(error = %e, model = %self.config.model, "Transcription failed");
                Ok(None)
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
