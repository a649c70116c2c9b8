//! Knowledge-base content search client
//!
//! REST client for a hosted content search service: one bucket per
//! language, top-N passages per query, concatenated passage text in the
//! response.

use crate::errors::{AssistantError, Result};
use crate::providers::SearchProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Request timeout for search calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the content search API
#[derive(Debug, Clone)]
pub struct ContentSearchClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ContentSearchClient {
    /// Create a search client
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(AssistantError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl SearchProvider for ContentSearchClient {
    async fn search(&self, bucket: u64, query: &str, top_n: usize) -> Result<String> {
        let url = format!("{}/search/{}", self.base_url, bucket);

        let response = self
            .client
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(&SearchRequest { query, n: top_n })
            .send()
            .await
            .map_err(|e| AssistantError::Api(format!("search request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AssistantError::Api(format!(
                "search authentication rejected (HTTP {})",
                status
            )));
        }
        if !status.is_success() {
            return Err(AssistantError::Api(format!(
                "search endpoint returned HTTP {}",
                status
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Api(format!("malformed search response: {}", e)))?;

        let text = parsed.search.text.unwrap_or_default();
        debug!(bucket, top_n, result_len = text.len(), "bucket search complete");
        Ok(text)
    }
}

/// Search request body
#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    n: usize,
}

/// Search response body
#[derive(Debug, Deserialize)]
struct SearchResponse {
    search: SearchResults,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ContentSearchClient::new("https://api.example.com/v1/", "key").unwrap();
        assert_eq!(client.base_url, "https://api.example.com/v1");
    }

    #[test]
    fn test_response_deserialization() {
        let parsed: SearchResponse =
            serde_json::from_str(r#"{"search": {"text": "passage one\npassage two"}}"#).unwrap();
        assert_eq!(parsed.search.text.unwrap(), "passage one\npassage two");

        // A hit-less search omits the text field entirely
        let empty: SearchResponse = serde_json::from_str(r#"{"search": {}}"#).unwrap();
        assert!(empty.search.text.is_none());
    }

    #[test]
    fn test_request_serialization() {
        let json = serde_json::to_string(&SearchRequest {
            query: "sepsis neonatal",
            n: 10,
        })
        .unwrap();
        assert_eq!(json, r#"{"query":"sepsis neonatal","n":10}"#);
    }
}
