//! Provider capability seams
//!
//! The pipeline depends on two external capabilities: text generation
//! (classification, translation, streaming chat) and knowledge-base
//! search. Both are trait objects so the core stays provider-agnostic.

pub mod decode;
pub mod ollama;
pub mod search;

// Re-export concrete providers
pub use ollama::OllamaProvider;
pub use search::ContentSearchClient;

use crate::errors::Result;
use crate::types::ChatMessage;
use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;

/// Lazy sequence of partial answer text from a streaming generation call
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Text-generation capability
///
/// `classify` and `translate` must be deterministic (zero temperature);
/// `generate_stream` produces partial text in arrival order and ends the
/// stream when generation completes.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Short-text classification; returns the model's raw reply
    async fn classify(&self, prompt: &str) -> Result<String>;

    /// Translation; returns only the translated text
    async fn translate(&self, prompt: &str) -> Result<String>;

    /// Streaming chat completion over role-tagged messages
    async fn generate_stream(&self, messages: Vec<ChatMessage>) -> Result<ChunkStream>;
}

/// Knowledge-base search capability
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search one bucket, returning concatenated passage text
    ///
    /// An empty string means nothing was found; that is not an error.
    async fn search(&self, bucket: u64, query: &str, top_n: usize) -> Result<String>;
}
