//! Alert delivery channels

use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use crate::{
    config::Config,
    errors::{WatchError, WatchResult},
};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Where rendered alerts go. `LogOnly` is the fallback when the channel is
/// unconfigured or the watcher runs in dry-run mode.
pub enum Notifier {
    Telegram(TelegramNotifier),
    LogOnly,
}

impl Notifier {
    pub fn from_config(config: &Config) -> Self {
        if config.dry_run {
            return Notifier::LogOnly;
        }
        match (&config.telegram_bot_token, &config.telegram_chat_id) {
            (Some(token), Some(chat_id)) => {
                match TelegramNotifier::new(
                    token.clone(),
                    chat_id.clone(),
                    Duration::from_secs(config.delivery_timeout_secs),
                ) {
                    Ok(notifier) => Notifier::Telegram(notifier),
                    Err(e) => {
                        warn!("⚠️ Telegram channel unavailable, alerts go to log: {}", e);
                        Notifier::LogOnly
                    }
                }
            }
            _ => Notifier::LogOnly,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Notifier::Telegram(_) => "telegram",
            Notifier::LogOnly => "log-only",
        }
    }

    pub async fn deliver(&self, text: &str) -> WatchResult<()> {
        match self {
            Notifier::Telegram(telegram) => telegram.send_message(text).await,
            Notifier::LogOnly => {
                warn!("📢 ALERT (log-only): {}", text);
                Ok(())
            }
        }
    }
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String, timeout: Duration) -> WatchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WatchError::Delivery {
                message: "failed to build HTTP client".to_string(),
                source: Some(e.into()),
            })?;
        Ok(Self {
            client,
            base_url: TELEGRAM_API_BASE.to_string(),
            bot_token,
            chat_id,
        })
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub async fn send_message(&self, text: &str) -> WatchResult<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);
        let payload = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML",
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| WatchError::Delivery {
                message: "Telegram request failed".to_string(),
                source: Some(e.into()),
            })?;

        if !response.status().is_success() {
            return Err(WatchError::Delivery {
                message: format!("Telegram returned {}", response.status()),
                source: None,
            });
        }

        debug!("Telegram alert delivered to chat {}", self.chat_id);
        Ok(())
    }
}
