//! Primary/fallback reply generator

use std::sync::Arc;

use voice_chatbot_config::{ProviderCredentials, Settings};
use voice_chatbot_llm::{
    ChatBackend, GeminiBackend, GeminiConfig, GroqBackend, GroqConfig, LlmBackend, LlmError,
    Message,
};

use crate::history::{normalize_history, HistoryEntry};
use crate::persona;
use crate::ReplyError;

/// Returned when no backend produced a reply
pub const BUSY_APOLOGY: &str = "Hệ thống đang bận chút xíu.";

/// Returned when the fallback answered with nothing
pub const NOT_HEARD_APOLOGY: &str = "Xin lỗi, tôi chưa nghe rõ.";

/// Emotion label used when the caller has none
pub const DEFAULT_EMOTION: &str = "neutral";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApologyKind {
    /// Both backends failed, or the fallback is disabled
    Busy,
    /// The fallback responded with blank text
    NotHeard,
}

impl ApologyKind {
    pub fn text(&self) -> &'static str {
        match self {
            ApologyKind::Busy => BUSY_APOLOGY,
            ApologyKind::NotHeard => NOT_HEARD_APOLOGY,
        }
    }
}

/// Which tier produced a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Primary,
    Secondary,
    Apology(ApologyKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Trimmed, never empty
    pub text: String,
    pub source: ReplySource,
}

impl Reply {
    fn apology(kind: ApologyKind) -> Self {
        Self {
            text: kind.text().to_string(),
            source: ReplySource::Apology(kind),
        }
    }
}

/// Conversational reply generator
///
/// Holds no per-call state; share one instance behind an `Arc` across tasks.
pub struct ReplyGenerator {
    primary: Option<Arc<dyn LlmBackend>>,
    secondary: Option<Arc<dyn ChatBackend>>,
}

impl ReplyGenerator {
    /// Build from already-constructed backends.
    ///
    /// Fails when neither backend is present.
    pub fn new(
        primary: Option<Arc<dyn LlmBackend>>,
        secondary: Option<Arc<dyn ChatBackend>>,
    ) -> Result<Self, ReplyError> {
        if primary.is_none() && secondary.is_none() {
            return Err(ReplyError::NoBackendConfigured);
        }

        tracing::info!(
            primary = primary.as_ref().map(|b| b.model_name()).unwrap_or("disabled"),
            secondary = secondary.as_ref().map(|b| b.model_name()).unwrap_or("disabled"),
            "Reply generator ready"
        );

        Ok(Self { primary, secondary })
    }

    /// Build Groq/Gemini backends from resolved credentials
    pub fn from_credentials(
        credentials: &ProviderCredentials,
        settings: &Settings,
    ) -> Result<Self, ReplyError> {
        if !credentials.has_primary() && !credentials.has_secondary() {
            return Err(ReplyError::NoBackendConfigured);
        }

        let primary = match &credentials.primary_api_key {
            Some(key) => {
                let config = GroqConfig::new(key.clone(), credentials.primary_model.clone())
                    .with_temperature(settings.llm_temperature)
                    .with_max_tokens(settings.llm_max_tokens);
                Some(Arc::new(GroqBackend::new(config)?) as Arc<dyn LlmBackend>)
            }
            None => None,
        };

        let secondary = match &credentials.secondary_api_key {
            Some(key) => {
                let config = GeminiConfig::new(
                    key.clone(),
                    credentials.secondary_model.clone(),
                    settings.generation_config(),
                );
                Some(Arc::new(GeminiBackend::new(config)?) as Arc<dyn ChatBackend>)
            }
            None => None,
        };

        Self::new(primary, secondary)
    }

    /// Resolve credentials from settings and the process environment
    pub fn from_settings(settings: &Settings) -> Result<Self, ReplyError> {
        Self::from_credentials(&ProviderCredentials::from_env(settings), settings)
    }

    pub fn primary_enabled(&self) -> bool {
        self.primary.is_some()
    }

    pub fn secondary_enabled(&self) -> bool {
        self.secondary.is_some()
    }

    /// Produce a reply; never fails and never returns an empty string
    pub async fn get_reply(
        &self,
        user_text: &str,
        emotion: Option<&str>,
        recent_messages: Option<&[HistoryEntry]>,
    ) -> String {
        self.get_reply_detailed(user_text, emotion, recent_messages)
            .await
            .text
    }

    /// Like [`get_reply`](Self::get_reply), also reporting which tier answered
    pub async fn get_reply_detailed(
        &self,
        user_text: &str,
        emotion: Option<&str>,
        recent_messages: Option<&[HistoryEntry]>,
    ) -> Reply {
        let emotion = emotion.unwrap_or(DEFAULT_EMOTION);
        let messages = build_primary_messages(user_text, emotion, recent_messages.unwrap_or(&[]));

        match self.ask_primary(&messages).await {
            Ok(text) => {
                return Reply {
                    text,
                    source: ReplySource::Primary,
                }
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    fallback_enabled = self.secondary.is_some(),
                    "Primary backend failed, falling back"
                );
            }
        }

        let Some(secondary) = &self.secondary else {
            return Reply::apology(ApologyKind::Busy);
        };

        let instruction = persona::secondary_instruction(emotion);
        let mut session = secondary.start_chat(&instruction, Vec::new());

        match session.send_message(user_text).await {
            Ok(result) => {
                let text = result.text.trim();
                if text.is_empty() {
                    tracing::warn!("Fallback backend returned empty text");
                    Reply::apology(ApologyKind::NotHeard)
                } else {
                    Reply {
                        text: text.to_string(),
                        source: ReplySource::Secondary,
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Fallback backend failed");
                Reply::apology(ApologyKind::Busy)
            }
        }
    }

    /// Trimmed primary reply; blank output counts as a failure
    async fn ask_primary(&self, messages: &[Message]) -> Result<String, LlmError> {
        let backend = self
            .primary
            .as_ref()
            .ok_or_else(|| LlmError::Configuration("primary backend not configured".to_string()))?;

        let result = backend.generate(messages).await?;
        let text = result.text.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse(backend.model_name().to_string()));
        }
        Ok(text.to_string())
    }
}

/// System persona, normalised history (oldest first), then the new user turn
fn build_primary_messages(
    user_text: &str,
    emotion: &str,
    history: &[HistoryEntry],
) -> Vec<Message> {
    let turns = normalize_history(history);

    let mut messages = Vec::with_capacity(turns.len() + 2);
    messages.push(Message::system(persona::primary_system_prompt()));
    messages.extend(turns.iter().map(|t| t.to_message()));
    messages.push(Message::user(persona::primary_user_prompt(emotion, user_text)));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use voice_chatbot_llm::{ChatSession, GenerationResult, Role};

    enum Behavior {
        Reply(&'static str),
        Fail,
    }

    impl Behavior {
        fn result(&self) -> Result<GenerationResult, LlmError> {
            match self {
                Behavior::Reply(text) => Ok(GenerationResult::text(*text)),
                Behavior::Fail => Err(LlmError::Api("HTTP 503: unavailable".to_string())),
            }
        }
    }

    struct StubPrimary {
        behavior: Behavior,
        calls: AtomicUsize,
        last_messages: Mutex<Vec<Message>>,
    }

    impl StubPrimary {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
                last_messages: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmBackend for StubPrimary {
        async fn generate(&self, messages: &[Message]) -> Result<GenerationResult, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_messages.lock() = messages.to_vec();
            self.behavior.result()
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "stub-primary"
        }
    }

    struct StubSecondary {
        behavior: Arc<Behavior>,
        chats: AtomicUsize,
        sent: Arc<Mutex<Vec<String>>>,
        last_start: Mutex<Option<(String, Vec<Message>)>>,
    }

    impl StubSecondary {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior: Arc::new(behavior),
                chats: AtomicUsize::new(0),
                sent: Arc::new(Mutex::new(Vec::new())),
                last_start: Mutex::new(None),
            })
        }
    }

    impl ChatBackend for StubSecondary {
        fn start_chat(
            &self,
            system_instruction: &str,
            history: Vec<Message>,
        ) -> Box<dyn ChatSession> {
            self.chats.fetch_add(1, Ordering::SeqCst);
            *self.last_start.lock() = Some((system_instruction.to_string(), history.clone()));
            Box::new(StubSession {
                behavior: self.behavior.clone(),
                sent: self.sent.clone(),
                history,
            })
        }

        fn model_name(&self) -> &str {
            "stub-secondary"
        }
    }

    struct StubSession {
        behavior: Arc<Behavior>,
        sent: Arc<Mutex<Vec<String>>>,
        history: Vec<Message>,
    }

    #[async_trait]
    impl ChatSession for StubSession {
        async fn send_message(&mut self, text: &str) -> Result<GenerationResult, LlmError> {
            self.sent.lock().push(text.to_string());
            self.behavior.result()
        }

        fn history(&self) -> &[Message] {
            &self.history
        }
    }

    fn generator(
        primary: Option<Arc<StubPrimary>>,
        secondary: Option<Arc<StubSecondary>>,
    ) -> ReplyGenerator {
        ReplyGenerator::new(
            primary.map(|p| p as Arc<dyn LlmBackend>),
            secondary.map(|s| s as Arc<dyn ChatBackend>),
        )
        .unwrap()
    }

    #[test]
    fn test_construction_requires_a_backend() {
        assert!(matches!(
            ReplyGenerator::new(None, None),
            Err(ReplyError::NoBackendConfigured)
        ));
    }

    #[test]
    fn test_from_credentials_without_keys_fails() {
        let settings = Settings::default();
        let credentials = ProviderCredentials::resolve(&settings, |_| None);
        assert!(matches!(
            ReplyGenerator::from_credentials(&credentials, &settings),
            Err(ReplyError::NoBackendConfigured)
        ));
    }

    #[test]
    fn test_from_credentials_secondary_only() {
        let settings = Settings::default();
        let credentials = ProviderCredentials::resolve(&settings, |key| {
            (key == "GEMINI_API_KEY").then(|| "gemini-key".to_string())
        });

        let generator = ReplyGenerator::from_credentials(&credentials, &settings).unwrap();
        assert!(!generator.primary_enabled());
        assert!(generator.secondary_enabled());
    }

    #[test]
    fn test_from_credentials_both() {
        let mut settings = Settings::default();
        settings.google_api_key = Some("google-key".to_string());
        let credentials = ProviderCredentials::resolve(&settings, |key| {
            (key == "GROQ_API_KEY").then(|| "gsk-key".to_string())
        });

        let generator = ReplyGenerator::from_credentials(&credentials, &settings).unwrap();
        assert!(generator.primary_enabled());
        assert!(generator.secondary_enabled());
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary = StubPrimary::new(Behavior::Reply("  Chào bạn!\n"));
        let secondary = StubSecondary::new(Behavior::Reply("fallback"));
        let replies = generator(Some(primary.clone()), Some(secondary.clone()));

        let reply = replies.get_reply_detailed("xin chào", None, None).await;
        assert_eq!(reply.text, "Chào bạn!");
        assert_eq!(reply.source, ReplySource::Primary);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.chats.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_primary_message_layout() {
        let primary = StubPrimary::new(Behavior::Reply("ok"));
        let replies = generator(Some(primary.clone()), None);

        let history = vec![HistoryEntry::user("trước"), HistoryEntry::assistant("sau")];
        replies.get_reply("tôi buồn", Some("sad"), Some(&history)).await;

        let messages = primary.last_messages.lock().clone();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, persona::PERSONA_DIRECTIVE);
        assert_eq!(messages[1], Message::user("trước"));
        assert_eq!(messages[2], Message::assistant("sau"));
        assert_eq!(messages[3].role, Role::User);
        assert_eq!(
            messages[3].content,
            persona::primary_user_prompt("sad", "tôi buồn")
        );
    }

    #[tokio::test]
    async fn test_default_emotion_is_neutral() {
        let primary = StubPrimary::new(Behavior::Reply("ok"));
        let replies = generator(Some(primary.clone()), None);

        replies.get_reply("hello", None, Some(&[])).await;

        let messages = primary.last_messages.lock().clone();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains(DEFAULT_EMOTION));
    }

    #[tokio::test]
    async fn test_primary_failure_without_fallback() {
        let primary = StubPrimary::new(Behavior::Fail);
        let replies = generator(Some(primary), None);

        let reply = replies.get_reply_detailed("hi", None, None).await;
        assert_eq!(reply.text, BUSY_APOLOGY);
        assert_eq!(reply.source, ReplySource::Apology(ApologyKind::Busy));
    }

    #[tokio::test]
    async fn test_blank_primary_without_fallback() {
        let primary = StubPrimary::new(Behavior::Reply(" \n\t "));
        let replies = generator(Some(primary), None);

        assert_eq!(replies.get_reply("hi", None, None).await, BUSY_APOLOGY);
    }

    #[tokio::test]
    async fn test_fallback_after_primary_error() {
        let primary = StubPrimary::new(Behavior::Fail);
        let secondary = StubSecondary::new(Behavior::Reply(" Mình ở đây nè. "));
        let replies = generator(Some(primary), Some(secondary.clone()));

        let reply = replies.get_reply_detailed("alo", Some("happy"), None).await;
        assert_eq!(reply.text, "Mình ở đây nè.");
        assert_eq!(reply.source, ReplySource::Secondary);
        assert_eq!(secondary.chats.load(Ordering::SeqCst), 1);

        let (instruction, history) = secondary.last_start.lock().clone().unwrap();
        assert_eq!(instruction, persona::secondary_instruction("happy"));
        assert!(history.is_empty());
        assert_eq!(*secondary.sent.lock(), vec!["alo".to_string()]);
    }

    #[tokio::test]
    async fn test_fallback_after_blank_primary() {
        let primary = StubPrimary::new(Behavior::Reply(""));
        let secondary = StubSecondary::new(Behavior::Reply("fallback reply"));
        let replies = generator(Some(primary), Some(secondary));

        assert_eq!(replies.get_reply("alo", None, None).await, "fallback reply");
    }

    #[tokio::test]
    async fn test_blank_fallback_is_not_heard() {
        let primary = StubPrimary::new(Behavior::Fail);
        let secondary = StubSecondary::new(Behavior::Reply("   "));
        let replies = generator(Some(primary), Some(secondary));

        let reply = replies.get_reply_detailed("alo", None, None).await;
        assert_eq!(reply.text, NOT_HEARD_APOLOGY);
        assert_eq!(reply.source, ReplySource::Apology(ApologyKind::NotHeard));
    }

    #[tokio::test]
    async fn test_both_backends_fail() {
        let primary = StubPrimary::new(Behavior::Fail);
        let secondary = StubSecondary::new(Behavior::Fail);
        let replies = generator(Some(primary), Some(secondary));

        assert_eq!(replies.get_reply("alo", None, None).await, BUSY_APOLOGY);
    }

    #[tokio::test]
    async fn test_secondary_only_routes_through_fallback() {
        let secondary = StubSecondary::new(Behavior::Reply("chỉ có dự phòng"));
        let replies = generator(None, Some(secondary.clone()));

        let reply = replies.get_reply_detailed("alo", None, None).await;
        assert_eq!(reply.text, "chỉ có dự phòng");
        assert_eq!(reply.source, ReplySource::Secondary);
        assert_eq!(secondary.chats.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_history_window_forwarded_to_primary_only() {
        let primary = StubPrimary::new(Behavior::Fail);
        let secondary = StubSecondary::new(Behavior::Reply("ok"));
        let replies = generator(Some(primary.clone()), Some(secondary.clone()));

        let mut history: Vec<HistoryEntry> = (0..15)
            .map(|i| HistoryEntry::user(format!("turn {}", i)))
            .collect();
        history[12] = HistoryEntry::new("system", "sys turn");
        history[13] = HistoryEntry {
            role: None,
            content: Some("no role".to_string()),
        };

        replies.get_reply("now", None, Some(&history)).await;

        let messages = primary.last_messages.lock().clone();
        // system + 10 history + user
        assert_eq!(messages.len(), 12);
        assert_eq!(messages[1].content, "turn 5");
        assert_eq!(messages[8], Message::assistant("sys turn"));
        assert_eq!(messages[9], Message::assistant("no role"));
        assert_eq!(messages[10], Message::user("turn 14"));

        let (_, secondary_history) = secondary.last_start.lock().clone().unwrap();
        assert!(secondary_history.is_empty());
    }
}
