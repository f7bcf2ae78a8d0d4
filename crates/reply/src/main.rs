//! Voice chatbot reply console
//!
//! Reads utterances from stdin (optionally prefixed with `emotion|`), prints
//! one reply per line, and keeps the recent exchange as history for the next
//! call. Logs go to stderr.

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use voice_chatbot_config::{load_settings, load_settings_from, Settings};
use voice_chatbot_reply::{HistoryEntry, ReplyGenerator, MAX_HISTORY_TURNS};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("VOICE_CHATBOT_ENV").ok();
    let loaded = match std::env::var("VOICE_CHATBOT_CONFIG") {
        Ok(path) => load_settings_from(path),
        Err(_) => load_settings(env.as_deref()),
    };
    let settings = match loaded {
        Ok(settings) => settings,
        Err(e) => {
            // Tracing not yet initialized
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&settings);

    tracing::info!("Starting voice chatbot v{}", env!("CARGO_PKG_VERSION"));

    let generator =
        ReplyGenerator::from_settings(&settings).context("failed to build reply generator")?;

    let mut history: Vec<HistoryEntry> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (emotion, text) = parse_line(line);
        let reply = generator
            .get_reply_detailed(text, emotion, Some(&history))
            .await;

        tracing::info!(source = ?reply.source, "Reply produced");
        println!("{}", reply.text);

        history.push(HistoryEntry::user(text));
        history.push(HistoryEntry::assistant(reply.text));
        if history.len() > MAX_HISTORY_TURNS {
            history.drain(..history.len() - MAX_HISTORY_TURNS);
        }
    }

    tracing::info!("Input closed, exiting");
    Ok(())
}

/// Split `emotion|text`; lines without a separator use the default emotion
fn parse_line(line: &str) -> (Option<&str>, &str) {
    match line.split_once('|') {
        Some((emotion, text)) if !emotion.trim().is_empty() => (Some(emotion.trim()), text.trim()),
        Some((_, text)) => (None, text.trim()),
        None => (None, line),
    }
}

fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &settings.observability.log_level;
        format!(
            "voice_chatbot={0},voice_chatbot_reply={0},voice_chatbot_llm={0},voice_chatbot_config={0}",
            level
        )
        .into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };
    subscriber.with(fmt_layer).init();
}
