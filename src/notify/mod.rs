//! Notification sinks
//!
//! The engine only emits `EngineEvent`s; sinks turn them into chat messages.
//! Delivery failures are logged and never reach the caller.

mod format;

pub use format::{format_event, format_results, format_status, format_trade_logs};

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::NotifyConfig;
use crate::lifecycle::EngineEvent;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_text(&self, text: &str);

    async fn notify(&self, event: &EngineEvent) {
        self.send_text(&format_event(event)).await;
    }
}

/// Writes messages to the tracing log only
#[derive(Debug, Default, Clone)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send_text(&self, text: &str) {
        info!(message = %text, "📣 Notification");
    }
}

/// Telegram Bot API `sendMessage`
pub struct TelegramSink {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramSink {
    /// Telegram rejects messages above 4096 chars; stay well below
    const CHUNK: usize = 3500;

    pub fn new(cfg: &NotifyConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                cfg.api_url.trim_end_matches('/'),
                cfg.bot_token
            ),
            chat_id: cfg.chat_id.clone(),
        })
    }

    async fn post(&self, text: &str) -> anyhow::Result<()> {
        let body = json!({ "chat_id": self.chat_id, "text": text });
        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Telegram API returned {}", response.status());
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn send_text(&self, text: &str) {
        for chunk in chunks(text, Self::CHUNK) {
            if let Err(e) = self.post(chunk).await {
                warn!(error = %e, "Telegram delivery failed");
                return;
            }
        }
    }
}

/// Split on char boundaries into pieces of at most `max` bytes.
///
/// A char wider than `max` becomes its own piece.
fn chunks(text: &str, max: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = text;
    while rest.len() > max {
        let mut cut = max;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == 0 {
            cut = rest.chars().next().map(char::len_utf8).unwrap_or(rest.len());
        }
        let (head, tail) = rest.split_at(cut);
        out.push(head);
        rest = tail;
    }
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

/// Telegram when a token and chat are configured, log-only otherwise
pub fn build_sink(cfg: &NotifyConfig) -> Arc<dyn NotificationSink> {
    if cfg.bot_token.is_empty() || cfg.chat_id.is_empty() {
        info!("Telegram not configured, notifications go to the log");
        return Arc::new(LogSink);
    }
    match TelegramSink::new(cfg) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            warn!(error = %e, "Telegram client init failed, using log sink");
            Arc::new(LogSink)
        }
    }
}
