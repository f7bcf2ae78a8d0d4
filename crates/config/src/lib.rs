//! Configuration management for the voice chatbot
//!
//! Supports loading configuration from:
//! - YAML/TOML files under `config/`
//! - Environment variables (`GOOGLE_API_KEY`, `LLM_TEMPERATURE`, ...)
//!
//! Provider credentials are resolved separately through
//! [`ProviderCredentials`], which also consults the raw environment
//! (`GROQ_API_KEY`, `GROQ_MODEL`, `GEMINI_API_KEY`).

pub mod credentials;
pub mod generation;
pub mod settings;

pub use credentials::{ProviderCredentials, DEFAULT_GROQ_MODEL};
pub use generation::{
    default_safety_settings, GenerationConfig, HarmBlockThreshold, HarmCategory, SafetySetting,
    DEFAULT_TOP_P,
};
pub use settings::{load_settings, load_settings_from, ObservabilityConfig, Settings};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => ConfigError::MissingField(key),
            other => ConfigError::ParseError(other.to_string()),
        }
    }
}
