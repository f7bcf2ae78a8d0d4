//! Reply generation for the voice chatbot
//!
//! [`ReplyGenerator`] turns a user utterance, an inferred emotion label and
//! the recent conversation into a short Vietnamese reply. The primary backend
//! answers every request; the secondary backend is tried only when the
//! primary fails or answers with nothing, and a fixed apology is returned when
//! both are unavailable. Reply generation itself never fails.

pub mod generator;
pub mod history;
pub mod persona;

pub use generator::{
    ApologyKind, Reply, ReplyGenerator, ReplySource, BUSY_APOLOGY, DEFAULT_EMOTION,
    NOT_HEARD_APOLOGY,
};
pub use history::{normalize_history, ConversationTurn, HistoryEntry, TurnRole, MAX_HISTORY_TURNS};

use thiserror::Error;
use voice_chatbot_llm::LlmError;

/// Errors raised while building a [`ReplyGenerator`]
#[derive(Error, Debug)]
pub enum ReplyError {
    #[error("No text-generation backend configured: set GROQ_API_KEY and/or GOOGLE_API_KEY/GEMINI_API_KEY")]
    NoBackendConfigured,

    #[error("Backend setup failed: {0}")]
    Backend(#[from] LlmError),
}
