//! Citation resolution
//!
//! Turns bracketed document mentions in generated answers into numbered
//! citations linked to real files on disk.
//!
//! Components:
//! - Corpus Index: one-shot enumeration of the reference document directory
//! - Citation Resolver: fuzzy mention matching, index assignment, rewrite

pub mod corpus;
pub mod resolver;

// Re-export key types
pub use corpus::CorpusIndex;
pub use resolver::CitationResolver;
