//! Provider credential resolution
//!
//! The primary (Groq) credentials only live in the raw environment. The
//! secondary (Gemini) key is taken from [`Settings`] first and falls back to
//! `GEMINI_API_KEY`.

use crate::Settings;

/// Model used when `GROQ_MODEL` is unset
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";

/// Resolved credentials for both text-generation providers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub primary_api_key: Option<String>,
    pub primary_model: String,
    pub secondary_api_key: Option<String>,
    pub secondary_model: String,
}

impl ProviderCredentials {
    /// Resolve credentials using `lookup` for raw environment values
    pub fn resolve<F>(settings: &Settings, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let primary_api_key = get("GROQ_API_KEY");
        let primary_model = get("GROQ_MODEL").unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string());

        let secondary_api_key = settings
            .google_api_key
            .clone()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| get("GEMINI_API_KEY"));

        Self {
            primary_api_key,
            primary_model,
            secondary_api_key,
            secondary_model: settings.gemini_model.clone(),
        }
    }

    /// Resolve credentials from the process environment
    pub fn from_env(settings: &Settings) -> Self {
        Self::resolve(settings, |key| std::env::var(key).ok())
    }

    pub fn has_primary(&self) -> bool {
        self.primary_api_key.is_some()
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary_api_key.is_some()
    }
}
