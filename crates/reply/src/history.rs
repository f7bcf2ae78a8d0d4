//! Conversation history normalisation
//!
//! Callers hand over loosely structured records (role and content may be
//! missing or carry arbitrary markers). Only the most recent
//! [`MAX_HISTORY_TURNS`] are kept, and every role other than `"user"` is
//! treated as the assistant.

use serde::{Deserialize, Serialize};
use voice_chatbot_llm::{Message, Role};

/// Number of history entries forwarded to the primary backend
pub const MAX_HISTORY_TURNS: usize = 10;

/// History record as supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl HistoryEntry {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            content: Some(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    /// Exactly `"user"` maps to [`TurnRole::User`]; anything else, including
    /// a missing marker, is the assistant.
    pub fn from_marker(marker: Option<&str>) -> Self {
        match marker {
            Some("user") => TurnRole::User,
            _ => TurnRole::Assistant,
        }
    }
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        }
    }
}

/// Normalised history turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn to_message(&self) -> Message {
        Message::new(self.role.into(), self.content.clone())
    }
}

impl From<&HistoryEntry> for ConversationTurn {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            role: TurnRole::from_marker(entry.role.as_deref()),
            content: entry.content.clone().unwrap_or_default(),
        }
    }
}

/// Keep the last [`MAX_HISTORY_TURNS`] entries, oldest first, with roles normalised
pub fn normalize_history(entries: &[HistoryEntry]) -> Vec<ConversationTurn> {
    let skip = entries.len().saturating_sub(MAX_HISTORY_TURNS);
    entries[skip..].iter().map(ConversationTurn::from).collect()
}
