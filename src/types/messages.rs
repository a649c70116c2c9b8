//! Message types for prompt construction and streaming
//!
//! Defines the role-tagged messages sent to the generation provider and
//! the event union consumers receive from a streamed turn.

use serde::{Deserialize, Serialize};

/// Message author role
///
/// The instruction + grounding context block travels as a user message
/// (reasoning models reject a dedicated system role), so only the two
/// conversational roles exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One role-tagged message in a generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Build a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Build an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One completed question/answer exchange kept in session history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub query: String,
    pub answer: String,
}

impl ConversationTurn {
    pub fn new(query: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            answer: answer.into(),
        }
    }
}

/// Events yielded by a streamed answer
///
/// `Chunk` carries raw partial text as it arrives; `Final` carries the
/// complete citation-resolved answer and is always the last event of a
/// successfully streamed turn. Consumers must render the two differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Partial answer text, in arrival order
    Chunk(String),
    /// The full answer with citations resolved, delivered once at the end
    Final(String),
}

impl StreamEvent {
    /// Text payload regardless of variant
    pub fn text(&self) -> &str {
        match self {
            StreamEvent::Chunk(text) | StreamEvent::Final(text) => text,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, StreamEvent::Final(_))
    }
}
