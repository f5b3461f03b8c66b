//! Alert delivery via the Telegram Bot API

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Delivers a human-readable message. Never fails; `false` means undelivered.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> bool;
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    timeout: Duration,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            timeout,
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }

    /// Point at a different Bot API server (self-hosted or a test fixture)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }

    async fn post(&self, message: &str) -> reqwest::Result<TelegramResponse> {
        let client = reqwest::Client::builder()
            .user_agent("openclaw-healthd")
            .timeout(self.timeout)
            .build()?;

        let form = [
            ("chat_id", self.chat_id.as_str()),
            ("text", message),
            ("disable_web_page_preview", "true"),
        ];

        client
            .post(self.endpoint())
            .form(&form)
            .send()
            .await?
            .json::<TelegramResponse>()
            .await
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> bool {
        if !self.is_configured() {
            debug!("Telegram credentials not configured, skipping notification");
            return false;
        }

        match self.post(message).await {
            Ok(response) if response.ok => true,
            Ok(response) => {
                warn!(
                    description = response.description.as_deref().unwrap_or(""),
                    "Telegram rejected notification"
                );
                false
            }
            // The token is part of the URL, so the error is logged without it.
            Err(e) => {
                warn!(error = %e.without_url(), "Failed to deliver Telegram notification");
                false
            }
        }
    }
}
