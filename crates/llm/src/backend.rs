//! Groq chat backend
//!
//! Streams one assistant turn at a time over the OpenAI-compatible
//! chat-completions SSE protocol. Each backend instance carries its own
//! running history; one instance is created per session so that no
//! caller's conversation can leak into another's.

use futures::StreamExt;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use laura_config::LlmConfig;
use laura_core::{Message, ReplyGenerator, ReplyStream, Role};

use crate::LlmError;

/// Canned fallback spoken when the provider fails mid-turn
const FALLBACK_REPLY: &str = "Disculpa, hubo un problema técnico. ¿Puedes repetir?";

/// Groq chat-completions backend with a per-instance running history
pub struct GroqChat {
    config: LlmConfig,
    system_prompt: String,
    client: Client,
    api_key: String,
    history: Mutex<Vec<Message>>,
}

impl GroqChat {
    /// Create a new backend
    ///
    /// The request timeout bounds every provider call; a hung turn ends
    /// with the canned fallback instead of stalling the session forever.
    pub fn new(
        config: LlmConfig,
        api_key: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LlmError::Configuration("API key required".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self {
            config,
            system_prompt: system_prompt.into(),
            client,
            api_key,
            history: Mutex::new(Vec::new()),
        })
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        )
    }

    /// Assemble the request messages: system prompt plus running history
    ///
    /// The user message must already be in the history when this is called.
    fn build_messages(&self) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage {
            role: "system".to_string(),
            content: self.system_prompt.clone(),
        }];
        messages.extend(self.history.lock().iter().map(|m| ChatMessage {
            role: match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            }
            .to_string(),
            content: m.content.clone(),
        }));
        messages
    }

    /// Number of turns in the running history (for tests and logging)
    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    /// Send the completion request and return the raw SSE byte stream
    async fn open_stream(
        &self,
    ) -> Result<impl futures::Stream<Item = reqwest::Result<bytes::Bytes>>, LlmError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: self.build_messages(),
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
            stream: Some(true),
        };

        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        Ok(response.bytes_stream())
    }
}

impl ReplyGenerator for GroqChat {
    fn generate_response<'a>(&'a self, user_text: &'a str) -> ReplyStream<'a> {
        Box::pin(async_stream::stream! {
            self.history.lock().push(Message::user(user_text));

            let byte_stream = match self.open_stream().await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::error!(error = %e, model = %self.config.model, "Reply generation failed");
                    yield FALLBACK_REPLY.to_string();
                    return;
                }
            };
            tokio::pin!(byte_stream);

            let mut buffer = String::new();
            let mut full_text = String::new();

            while let Some(chunk) = byte_stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::error!(error = %e, model = %self.config.model, "Reply stream interrupted");
                        yield FALLBACK_REPLY.to_string();
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // Process complete SSE lines
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.is_empty() || line == "data: [DONE]" {
                        continue;
                    }

                    if let Some(json_str) = line.strip_prefix("data: ") {
                        if let Ok(chunk) = serde_json::from_str::<StreamChunk>(json_str) {
                            if let Some(content) = chunk
                                .choices
                                .first()
                                .and_then(|c| c.delta.as_ref())
                                .and_then(|d| d.content.as_ref())
                            {
                                full_text.push_str(content);
                                yield content.clone();
                            }
                        }
                    }
                }
            }

            if !full_text.is_empty() {
                self.history.lock().push(Message::assistant(&full_text));
            }
            tracing::debug!(
                model = %self.config.model,
                reply_chars = full_text.len(),
                "Reply generation complete"
            );
        })
    }

    fn clear_history(&self) {
        self.history.lock().clear();
        tracing::info!("Conversation history cleared");
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Option<StreamDelta>,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn test_backend(endpoint: &str) -> GroqChat {
        let config = LlmConfig {
            endpoint: endpoint.to_string(),
            timeout_secs: 1,
            ..Default::default()
        };
        GroqChat::new(config, "gsk_test", "Eres Laura.").unwrap()
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let result = GroqChat::new(LlmConfig::default(), "", "prompt");
        assert!(matches!(result, Err(LlmError::Configuration(_))));
    }

    #[test]
    fn test_build_messages_prepends_system_prompt() {
        let backend = test_backend("http://localhost:9");
        backend.history.lock().push(Message::user("hola"));

        let messages = backend.build_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, "Eres Laura.");
        assert_eq!(messages[1].role, "user");
    }

    #[tokio::test]
    async fn test_provider_failure_yields_single_fallback_fragment() {
        // Nothing listens on this port, so the request fails immediately
        let backend = test_backend("http://127.0.0.1:9");

        let fragments: Vec<String> = backend.generate_response("hola").collect().await;
        assert_eq!(fragments, vec![FALLBACK_REPLY.to_string()]);

        // The user turn is recorded; no assistant turn is added
        let history = backend.history.lock();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_clear_history_resets_running_history() {
        let backend = test_backend("http://127.0.0.1:9");
        let _: Vec<String> = backend.generate_response("hola").collect().await;
        assert_eq!(backend.history_len(), 1);

        backend.clear_history();
        assert_eq!(backend.history_len(), 0);
    }

    #[test]
    fn test_stream_chunk_parsing() {
        let json = r#"{"choices":[{"delta":{"content":"Hola"},"finish_reason":null}]}"#;
        let chunk: StreamChunk = serde_json::from_str(json).unwrap();
        assert_eq!(
            chunk.choices[0].delta.as_ref().unwrap().content.as_deref(),
            Some("Hola")
        );
    }
}
