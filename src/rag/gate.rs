//! Retrieval gate
//!
//! Decides whether a query needs document grounding. A keyword hit decides
//! deterministically without any provider call; otherwise a short
//! zero-temperature classification estimates topical relevance on a 0-100
//! scale and the gate retrieves at or above the threshold.

use crate::errors::{AssistantError, Result};
use crate::providers::GenerationProvider;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Probability threshold (0-100) at which grounding is fetched
pub const CLASSIFICATION_THRESHOLD: f32 = 50.0;

/// Per-query decision on whether to fetch grounding context
pub struct RetrievalGate {
    provider: Arc<dyn GenerationProvider>,
    keywords: Vec<String>,
    topic: String,
    threshold: f32,
}

impl RetrievalGate {
    /// Create a gate over a preloaded keyword list
    ///
    /// `topic` names the subject area the classifier scores queries against.
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        keywords: Vec<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            keywords,
            topic: topic.into(),
            threshold: CLASSIFICATION_THRESHOLD,
        }
    }

    /// Load the keyword list from a file, one keyword per line
    ///
    /// Empty lines and `#` comment lines are skipped; keywords are
    /// lowercased. A missing file logs a warning and yields an empty list
    /// (the gate then always falls through to classification).
    pub fn load_keywords(path: impl AsRef<Path>) -> Vec<String> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_lowercase)
                .collect(),
            Err(_) => {
                warn!(path = %path.display(), "keyword file not found, defaulting to empty list");
                Vec::new()
            }
        }
    }

    /// Decide whether grounding context should be fetched for `query`
    pub async fn should_retrieve(&self, query: &str) -> Result<bool> {
        let lower_query = query.to_lowercase();
        for keyword in &self.keywords {
            if lower_query.contains(keyword.as_str()) {
                info!(keyword = %keyword, "keyword hit, retrieving without classification");
                return Ok(true);
            }
        }

        let prompt = format!(
            "Eres un clasificador de textos sencillo.\n\
             Dada la consulta del usuario, estima la probabilidad (0-100) de que la consulta \
             sea sobre {topic} o cualquier disciplina o tematica relacionada con {topic}.\n\
             Devuelve SOLO un numero del 0 al 100 (un entero). Sin texto adicional.\n\n\
             User query: {query}",
            topic = self.topic,
            query = query
        );

        let reply = self
            .provider
            .classify(&prompt)
            .await
            .map_err(|e| AssistantError::Classification(e.to_string()))?;

        let probability: f32 = match reply.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                info!(reply = %reply.trim(), "unparseable classification reply, defaulting to 50");
                50.0
            }
        };

        info!(probability, threshold = self.threshold, "classification verdict");
        Ok(probability >= self.threshold)
    }

    /// Loaded keywords
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ChunkStream;
    use crate::types::ChatMessage;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::Mutex;

    /// Classifier stub that records invocations and replies with a canned string
    struct StubProvider {
        reply: String,
        calls: Mutex<usize>,
    }

    impl StubProvider {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                calls: Mutex::new(0),
            })
        }

        fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl GenerationProvider for StubProvider {
        async fn classify(&self, _prompt: &str) -> Result<String> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.reply.clone())
        }

        async fn translate(&self, _prompt: &str) -> Result<String> {
            unreachable!("gate never translates")
        }

        async fn generate_stream(&self, _messages: Vec<ChatMessage>) -> Result<ChunkStream> {
            unreachable!("gate never generates")
        }
    }

    fn gate_with(provider: Arc<StubProvider>, keywords: &[&str]) -> RetrievalGate {
        RetrievalGate::new(
            provider,
            keywords.iter().map(|k| k.to_string()).collect(),
            "infectologia",
        )
    }

    #[tokio::test]
    async fn test_keyword_hit_skips_classifier() {
        let provider = StubProvider::replying("0");
        let gate = gate_with(provider.clone(), &["sepsis", "antibiotico"]);

        assert!(gate.should_retrieve("Dosis en SEPSIS neonatal?").await.unwrap());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_classifier_boundary_at_threshold() {
        let provider = StubProvider::replying("50");
        let gate = gate_with(provider.clone(), &[]);
        assert!(gate.should_retrieve("una consulta").await.unwrap());

        let provider = StubProvider::replying("49");
        let gate = gate_with(provider.clone(), &[]);
        assert!(!gate.should_retrieve("una consulta").await.unwrap());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_reply_defaults_to_retrieve() {
        let provider = StubProvider::replying("probablemente si");
        let gate = gate_with(provider, &[]);

        // Default of 50 meets the >= 50 threshold
        assert!(gate.should_retrieve("una consulta").await.unwrap());
    }

    #[tokio::test]
    async fn test_high_probability_retrieves() {
        let provider = StubProvider::replying(" 87 ");
        let gate = gate_with(provider, &[]);

        assert!(gate.should_retrieve("fiebre persistente").await.unwrap());
    }

    #[test]
    fn test_load_keywords_skips_comments_and_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment line").unwrap();
        writeln!(file, "Sepsis").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  Meningitis  ").unwrap();

        let keywords = RetrievalGate::load_keywords(file.path());
        assert_eq!(keywords, ["sepsis", "meningitis"]);
    }

    #[test]
    fn test_load_keywords_missing_file_is_empty() {
        let keywords = RetrievalGate::load_keywords("/nonexistent/kw.txt");
        assert!(keywords.is_empty());
    }
}
