//! Ollama-backed generation provider
//!
//! Implements the generation capability against the Ollama HTTP API:
//! `/api/chat` with `stream: true` for answer generation and with
//! `stream: false` plus zero temperature for classification and
//! translation.

use crate::errors::{AssistantError, Result};
use crate::providers::decode::JsonChunkDecoder;
use crate::providers::{ChunkStream, GenerationProvider};
use crate::types::ChatMessage;
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default model for streamed answers
pub const DEFAULT_CHAT_MODEL: &str = "qwen2.5:7b-instruct";

/// Request timeout; generous because answers stream over it
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Ollama chat client
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    chat_model: String,
    utility_model: String,
}

impl OllamaProvider {
    /// Create a provider with default endpoint and models
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_OLLAMA_URL, DEFAULT_CHAT_MODEL, DEFAULT_CHAT_MODEL)
    }

    /// Create a provider with custom endpoint and models
    ///
    /// `utility_model` serves the short classification/translation calls;
    /// `chat_model` serves streamed answers.
    pub fn with_config(base_url: &str, chat_model: &str, utility_model: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(AssistantError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            chat_model: chat_model.to_string(),
            utility_model: utility_model.to_string(),
        })
    }

    /// One-shot zero-temperature chat completion
    async fn complete_deterministic(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);

        let request = ChatRequest {
            model: self.utility_model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            stream: false,
            options: Some(json!({ "temperature": 0 })),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::Api(format!("chat request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AssistantError::Api(format!(
                "chat endpoint returned HTTP {}",
                response.status()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Api(format!("malformed chat response: {}", e)))?;

        Ok(parsed
            .message
            .map(|m| m.content.trim().to_string())
            .unwrap_or_default())
    }

    /// Current base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Model used for streamed answers
    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }
}

#[async_trait]
impl GenerationProvider for OllamaProvider {
    async fn classify(&self, prompt: &str) -> Result<String> {
        self.complete_deterministic(prompt).await
    }

    async fn translate(&self, prompt: &str) -> Result<String> {
        self.complete_deterministic(prompt).await
    }

    async fn generate_stream(&self, messages: Vec<ChatMessage>) -> Result<ChunkStream> {
        let url = format!("{}/api/chat", self.base_url);

        let request = ChatRequest {
            model: self.chat_model.clone(),
            messages,
            stream: true,
            options: None,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::Api(format!("chat request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AssistantError::Api(format!(
                "chat endpoint returned HTTP {}",
                response.status()
            )));
        }

        debug!(model = %self.chat_model, "generation stream opened");

        let bytes = Box::pin(response.bytes_stream());
        let state = StreamState {
            bytes,
            decoder: JsonChunkDecoder::new(),
            pending: VecDeque::new(),
            done: false,
        };

        let chunk_stream = stream::unfold(state, |mut state| async move {
            loop {
                if let Some(text) = state.pending.pop_front() {
                    return Some((Ok(text), state));
                }
                if state.done {
                    return None;
                }

                match state.bytes.next().await {
                    Some(Ok(chunk)) => {
                        let objects = match state.decoder.push(&chunk) {
                            Ok(objects) => objects,
                            Err(e) => {
                                state.done = true;
                                return Some((Err(e), state));
                            }
                        };

                        for object in objects {
                            match serde_json::from_str::<ChatResponse>(&object) {
                                Ok(parsed) => {
                                    if parsed.done {
                                        state.done = true;
                                    }
                                    if let Some(message) = parsed.message {
                                        if !message.content.is_empty() {
                                            state.pending.push_back(message.content);
                                        }
                                    }
                                }
                                Err(e) => {
                                    state.done = true;
                                    return Some((
                                        Err(AssistantError::Streaming(format!(
                                            "malformed stream chunk: {}",
                                            e
                                        ))),
                                        state,
                                    ));
                                }
                            }
                        }
                    }
                    Some(Err(e)) => {
                        state.done = true;
                        return Some((Err(AssistantError::Streaming(e.to_string())), state));
                    }
                    None => return None,
                }
            }
        });

        Ok(Box::pin(chunk_stream))
    }
}

/// Mutable state threaded through the chunk stream
struct StreamState {
    bytes: std::pin::Pin<
        Box<dyn futures_util::Stream<Item = reqwest::Result<bytes::Bytes>> + Send>,
    >,
    decoder: JsonChunkDecoder,
    pending: VecDeque<String>,
    done: bool,
}

/// Chat request body
#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<serde_json::Value>,
}

/// Chat response body (whole for one-shot, per-object for streamed)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatResponseMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = OllamaProvider::new().unwrap();
        assert_eq!(provider.base_url(), DEFAULT_OLLAMA_URL);
        assert_eq!(provider.chat_model(), DEFAULT_CHAT_MODEL);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider =
            OllamaProvider::with_config("http://localhost:11434/", "m1", "m2").unwrap();
        assert_eq!(provider.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage::user("hola")],
            stream: true,
            options: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""stream":true"#));
        assert!(json.contains(r#""role":"user""#));
        assert!(!json.contains("options"));
    }

    #[test]
    fn test_stream_chunk_deserialization() {
        let chunk: ChatResponse =
            serde_json::from_str(r#"{"message": {"role": "assistant", "content": "ho"}, "done": false}"#)
                .unwrap();
        assert_eq!(chunk.message.unwrap().content, "ho");
        assert!(!chunk.done);

        let last: ChatResponse = serde_json::from_str(r#"{"done": true}"#).unwrap();
        assert!(last.done);
        assert!(last.message.is_none());
    }
}
