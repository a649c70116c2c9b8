//! Grounding context retriever
//!
//! Issues one knowledge-base search per language (the user's query plus
//! its translation) and merges the passage text. An empty merge is a soft
//! failure the caller substitutes a fallback context for; transport and
//! auth failures stay hard.

use crate::errors::{AssistantError, Result};
use crate::providers::{GenerationProvider, SearchProvider};
use std::sync::Arc;
use tracing::{debug, info};

/// Default number of top passages requested per bucket search
pub const DEFAULT_TOP_N: usize = 10;

/// Fetches and merges grounding text from the knowledge-base buckets
pub struct ContextRetriever {
    search: Arc<dyn SearchProvider>,
    generation: Arc<dyn GenerationProvider>,
    bucket_primary: u64,
    bucket_translated: u64,
    top_n: usize,
}

impl ContextRetriever {
    /// Create a retriever searching one bucket with both queries
    pub fn new(
        search: Arc<dyn SearchProvider>,
        generation: Arc<dyn GenerationProvider>,
        bucket: u64,
    ) -> Self {
        Self::with_buckets(search, generation, bucket, bucket, DEFAULT_TOP_N)
    }

    /// Create a retriever with distinct buckets per language
    pub fn with_buckets(
        search: Arc<dyn SearchProvider>,
        generation: Arc<dyn GenerationProvider>,
        bucket_primary: u64,
        bucket_translated: u64,
        top_n: usize,
    ) -> Self {
        Self {
            search,
            generation,
            bucket_primary,
            bucket_translated,
            top_n,
        }
    }

    /// Fetch grounding text for a query and its translation
    ///
    /// The translated-language result comes first in the merged text. Both
    /// results empty is a soft `Retrieval` error.
    pub async fn fetch_context(
        &self,
        query_primary: &str,
        query_translated: &str,
    ) -> Result<String> {
        let text_translated = self
            .search
            .search(self.bucket_translated, query_translated, self.top_n)
            .await?;

        let text_primary = self
            .search
            .search(self.bucket_primary, query_primary, self.top_n)
            .await?;

        debug!(
            translated_len = text_translated.len(),
            primary_len = text_primary.len(),
            "bucket searches complete"
        );

        let combined = format!("{}\n{}", text_translated, text_primary)
            .trim()
            .to_string();

        if combined.is_empty() {
            return Err(AssistantError::Retrieval(
                "no context found in either bucket".to_string(),
            ));
        }

        info!(context_len = combined.len(), "grounding context assembled");
        Ok(combined)
    }

    /// Translate a query for the second bucket search
    ///
    /// Zero-temperature generation instructed to output only the
    /// translation. Failures map into the soft retrieval path.
    pub async fn translate(&self, text: &str) -> Result<String> {
        let prompt = format!(
            "Translate the following text from Spanish to English.\n\
             Output only the translated text, nothing else.\n\n\
             Text to translate:\n{}",
            text
        );

        let translated = self
            .generation
            .translate(&prompt)
            .await
            .map_err(|e| AssistantError::Translation(e.to_string()))?;

        Ok(translated.trim().to_string())
    }
}
