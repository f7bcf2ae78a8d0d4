//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::generation::GenerationConfig;
use crate::ConfigError;

/// Application settings shared by both text-generation providers
///
/// Field names match the flat environment variables the deployment already
/// exports (`GOOGLE_API_KEY`, `LLM_TEMPERATURE`, `LLM_MAX_TOKENS`, `GEMINI_MODEL`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Google API key for the Gemini fallback backend
    #[serde(default)]
    pub google_api_key: Option<String>,

    /// Sampling temperature for both providers
    #[serde(default = "default_temperature")]
    pub llm_temperature: f32,

    /// Maximum output tokens for both providers
    #[serde(default = "default_max_tokens")]
    pub llm_max_tokens: u32,

    /// Gemini model identifier
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    256
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            google_api_key: None,
            llm_temperature: default_temperature(),
            llm_max_tokens: default_max_tokens(),
            gemini_model: default_gemini_model(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Settings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm_temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm_temperature".to_string(),
                message: format!("Must be between 0.0 and 2.0, got {}", self.llm_temperature),
            });
        }

        if self.llm_max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm_max_tokens".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.gemini_model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "gemini_model".to_string(),
                message: "Model name cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Generation tunables for the Gemini fallback
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig::new(self.llm_temperature, self.llm_max_tokens)
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (`__` separates nested keys)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(environment_source());

    finish(builder.build()?)
}

/// Load settings from an explicit file, still allowing environment overrides
pub fn load_settings_from(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config = Config::builder()
        .add_source(File::from(path))
        .add_source(environment_source())
        .build()?;

    finish(config)
}

/// Flat variables read from the process environment
const SETTINGS_ENV_KEYS: &[&str] = &[
    "GOOGLE_API_KEY",
    "LLM_TEMPERATURE",
    "LLM_MAX_TOKENS",
    "GEMINI_MODEL",
];

fn environment_source() -> Environment {
    // Unprefixed keys, so only forward the ones Settings knows about.
    let vars: config::Map<String, String> = std::env::vars()
        .filter(|(key, _)| {
            SETTINGS_ENV_KEYS.contains(&key.as_str()) || key.starts_with("OBSERVABILITY__")
        })
        .collect();

    Environment::default()
        .separator("__")
        .try_parsing(true)
        .source(Some(vars))
}

fn finish(config: Config) -> Result<Settings, ConfigError> {
    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;

    tracing::debug!(
        gemini_model = %settings.gemini_model,
        temperature = settings.llm_temperature,
        max_tokens = settings.llm_max_tokens,
        google_key_present = settings.google_api_key.is_some(),
        "Settings loaded"
    );

    Ok(settings)
}
