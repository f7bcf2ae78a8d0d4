//! Text-generation backends for the voice chatbot
//!
//! Features:
//! - Primary backend over the OpenAI-compatible Groq chat completions API
//! - Secondary Gemini backend with chat sessions, safety settings and
//!   generation tunables
//! - Backend traits so callers can inject their own clients

pub mod backend;
pub mod gemini;
pub mod message;

pub use backend::{FinishReason, GenerationResult, GroqBackend, GroqConfig, LlmBackend};
pub use gemini::{ChatBackend, ChatSession, GeminiBackend, GeminiChatSession, GeminiConfig};
pub use message::{Message, Role};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Empty response from {0}")]
    EmptyResponse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            // URLs may carry credentials
            LlmError::Network(err.without_url().to_string())
        }
    }
}
