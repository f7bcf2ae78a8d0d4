//! Gemini backend with chat sessions
//!
//! Mirrors the session-style usage of the Gemini API: a model is bound to a
//! system instruction, generation tunables and safety settings, a chat is
//! started from a (possibly empty) history, and each `send_message` replays
//! the session history plus the new user turn to `generateContent`.
//!
//! The API key is owned by the backend instance and sent per request in the
//! `x-goog-api-key` header, so it never appears in request URLs or in the
//! errors derived from them.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use voice_chatbot_config::{default_safety_settings, GenerationConfig, SafetySetting};

use crate::backend::{FinishReason, GenerationResult};
use crate::message::{Message, Role};
use crate::LlmError;

/// Backend able to open conversational sessions
pub trait ChatBackend: Send + Sync {
    /// Start a chat bound to `system_instruction`, seeded with `history`
    fn start_chat(&self, system_instruction: &str, history: Vec<Message>) -> Box<dyn ChatSession>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// A single conversational session
#[async_trait]
pub trait ChatSession: Send {
    /// Send one user message and return the model's reply
    async fn send_message(&mut self, text: &str) -> Result<GenerationResult, LlmError>;

    /// Turns exchanged so far, oldest first
    fn history(&self) -> &[Message];
}

/// Configuration for the Gemini backend
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API base, including the version segment
    pub endpoint: String,
    /// API key
    pub api_key: String,
    /// Model name, e.g. `gemini-1.5-flash`
    pub model_name: String,
    /// Sampling parameters
    pub generation_config: GenerationConfig,
    /// Content-safety thresholds
    pub safety_settings: Vec<SafetySetting>,
    /// Request timeout
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(
        api_key: impl Into<String>,
        model_name: impl Into<String>,
        generation_config: GenerationConfig,
    ) -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: api_key.into(),
            model_name: model_name.into(),
            generation_config,
            safety_settings: default_safety_settings(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Gemini `generateContent` backend
pub struct GeminiBackend {
    config: Arc<GeminiConfig>,
    client: Client,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Configuration(
                "GOOGLE_API_KEY or GEMINI_API_KEY is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Start a concrete session (see [`ChatBackend::start_chat`])
    pub fn start_session(
        &self,
        system_instruction: impl Into<String>,
        history: Vec<Message>,
    ) -> GeminiChatSession {
        GeminiChatSession {
            client: self.client.clone(),
            config: self.config.clone(),
            system_instruction: system_instruction.into(),
            history,
        }
    }
}

impl ChatBackend for GeminiBackend {
    fn start_chat(&self, system_instruction: &str, history: Vec<Message>) -> Box<dyn ChatSession> {
        Box::new(self.start_session(system_instruction, history))
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

/// Chat session against one Gemini model
pub struct GeminiChatSession {
    client: Client,
    config: Arc<GeminiConfig>,
    system_instruction: String,
    history: Vec<Message>,
}

impl GeminiChatSession {
    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model_name
        )
    }

    fn build_request(&self, text: &str) -> GenerateContentRequest {
        let mut contents: Vec<Content> = self.history.iter().map(Content::from).collect();
        contents.push(Content::from(&Message::user(text)));

        GenerateContentRequest {
            system_instruction: (!self.system_instruction.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part {
                    text: Some(self.system_instruction.clone()),
                }],
            }),
            contents,
            generation_config: self.config.generation_config,
            safety_settings: self.config.safety_settings.clone(),
        }
    }
}

#[async_trait]
impl ChatSession for GeminiChatSession {
    async fn send_message(&mut self, text: &str) -> Result<GenerationResult, LlmError> {
        let start = Instant::now();
        let request = self.build_request(text);

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let result = response.into_result(start.elapsed().as_millis() as u64)?;

        tracing::debug!(
            model = %self.config.model_name,
            tokens = result.tokens,
            total_time_ms = result.total_time_ms,
            "Gemini reply received"
        );

        self.history.push(Message::user(text));
        self.history.push(Message::assistant(result.text.clone()));

        Ok(result)
    }

    fn history(&self) -> &[Message] {
        &self.history
    }
}

// Gemini API types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl From<&Message> for Content {
    fn from(msg: &Message) -> Self {
        let role = match msg.role {
            Role::Assistant => "model",
            Role::User | Role::System => "user",
        };
        Self {
            role: Some(role.to_string()),
            parts: vec![Part {
                text: Some(msg.content.clone()),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    candidates_token_count: usize,
}

impl GenerateContentResponse {
    /// Extract the first candidate's text.
    ///
    /// A response with no usable candidate (blocked prompt, filtered output)
    /// is an error; a candidate whose parts carry no text yields empty text.
    fn into_result(self, total_time_ms: u64) -> Result<GenerationResult, LlmError> {
        let tokens = self
            .usage_metadata
            .map(|u| u.candidates_token_count)
            .unwrap_or(0);

        let candidate = match self.candidates.into_iter().next() {
            Some(candidate) => candidate,
            None => {
                let reason = self
                    .prompt_feedback
                    .and_then(|f| f.block_reason)
                    .unwrap_or_else(|| "no candidates".to_string());
                return Err(LlmError::Generation(format!("Prompt blocked: {}", reason)));
            }
        };

        let finish_reason = match candidate.finish_reason.as_deref() {
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") => FinishReason::Safety,
            _ => FinishReason::Stop,
        };

        let parts = candidate
            .content
            .map(|c| c.parts)
            .filter(|parts| !parts.is_empty())
            .ok_or_else(|| {
                LlmError::Generation(format!(
                    "Candidate has no content (finish reason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ))
            })?;

        let text = parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(GenerationResult {
            text,
            tokens,
            total_time_ms,
            finish_reason,
        })
    }
}
