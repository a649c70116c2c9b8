//! Bounded conversation session
//!
//! Owns the question/answer history for one logical conversation and
//! composes the role-tagged prompt for each new turn. Capacity is fixed:
//! oldest turns are evicted FIFO once the bound is reached. The session
//! performs no locking; callers must serialize access per session.

use crate::types::{ChatMessage, ConversationTurn};
use std::collections::VecDeque;
use tracing::debug;
use uuid::Uuid;

/// Maximum number of retained conversation turns
pub const MAX_HISTORY_TURNS: usize = 10;

/// Per-conversation state: bounded history plus prompt assembly
#[derive(Debug, Clone)]
pub struct ConversationSession {
    /// Session identity, used only for log correlation
    id: Uuid,

    /// Completed turns, oldest first (bounded by `max_turns`)
    history: VecDeque<ConversationTurn>,

    /// Maximum retained turns
    max_turns: usize,
}

impl ConversationSession {
    /// Create a session with the default history bound
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY_TURNS)
    }

    /// Create a session with a custom history bound
    pub fn with_capacity(max_turns: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            history: VecDeque::with_capacity(max_turns),
            max_turns,
        }
    }

    /// Record a completed turn, evicting the oldest once over capacity
    pub fn record_turn(&mut self, query: impl Into<String>, answer: impl Into<String>) {
        self.history.push_back(ConversationTurn::new(query, answer));
        if self.history.len() > self.max_turns {
            self.history.pop_front();
        }
        debug!(session = %self.id, turns = self.history.len(), "recorded turn");
    }

    /// Remove the most recent turn; no-op on an empty history
    pub fn erase_last(&mut self) -> Option<ConversationTurn> {
        let popped = self.history.pop_back();
        if popped.is_some() {
            debug!(session = %self.id, turns = self.history.len(), "erased last turn");
        }
        popped
    }

    /// Compose the full message sequence for a new query
    ///
    /// Layout: one leading user message carrying the instruction text with
    /// the grounding context framed by `===` delimiters, then one
    /// user/assistant pair per history turn in chronological order, then
    /// the new query as the final user message.
    pub fn build_prompt(
        &self,
        instruction: &str,
        grounding_context: &str,
        query: &str,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() * 2 + 2);

        messages.push(ChatMessage::user(format!(
            "{}\n===\n{}\n===",
            instruction, grounding_context
        )));

        for turn in &self.history {
            messages.push(ChatMessage::user(turn.query.clone()));
            messages.push(ChatMessage::assistant(turn.answer.clone()));
        }

        messages.push(ChatMessage::user(query.to_string()));
        messages
    }

    /// Session identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Retained turns, oldest first
    pub fn history(&self) -> &VecDeque<ConversationTurn> {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}
