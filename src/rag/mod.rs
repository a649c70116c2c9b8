//! Retrieval-augmented grounding
//!
//! Decides per query whether document grounding is worth fetching and, if
//! so, pulls passage text from the knowledge-base buckets.
//!
//! Components:
//! - Retrieval Gate: keyword short-circuit plus probability classification
//! - Context Retriever: dual-language bucket search and merge

pub mod gate;
pub mod retriever;

// Re-export key types
pub use gate::RetrievalGate;
pub use retriever::ContextRetriever;
