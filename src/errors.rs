//! Error types for the docent assistant
//!
//! One error enum covers the whole pipeline. The controller decides per
//! variant whether a failure is soft (fallback context, fail-open gating)
//! or fatal for the turn.

use thiserror::Error;

/// Main error type for the assistant pipeline
#[derive(Error, Debug)]
pub enum AssistantError {
    /// Relevance classification failed (gate fails open on this)
    #[error("Classification error: {0}")]
    Classification(String),

    /// Query translation failed (handled as a soft retrieval failure)
    #[error("Translation error: {0}")]
    Translation(String),

    /// Soft retrieval failure: no grounding text came back
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Hard provider failure (bad status, auth, malformed response)
    #[error("Provider API error: {0}")]
    Api(String),

    /// Mid-stream generation errors
    #[error("Streaming error: {0}")]
    Streaming(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

/// Convert anyhow errors (config/instruction loading) to AssistantError
impl From<anyhow::Error> for AssistantError {
    fn from(err: anyhow::Error) -> Self {
        AssistantError::Config(err.to_string())
    }
}
