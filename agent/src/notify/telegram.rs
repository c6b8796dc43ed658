//! Telegram notification channel

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, error};

use crate::errors::BackupError;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Delivers operator messages
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<(), BackupError>;
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Telegram bot API client
pub struct TelegramNotifier {
    client: Client,
    base_url: String,
    bot_token: SecretString,
    chat_id: String,
}

impl TelegramNotifier {
    /// Create a notifier for the public Bot API
    pub fn new(bot_token: SecretString, chat_id: impl Into<String>) -> Result<Self, BackupError> {
        Self::with_base_url(TELEGRAM_API_URL, bot_token, chat_id)
    }

    /// Create a notifier against a custom Bot API server
    pub fn with_base_url(
        base_url: &str,
        bot_token: SecretString,
        chat_id: impl Into<String>,
    ) -> Result<Self, BackupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bot_token,
            chat_id: chat_id.into(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, text: &str) -> Result<(), BackupError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.base_url,
            self.bot_token.expose_secret()
        );
        debug!("POST {}/bot***/sendMessage", self.base_url);

        let body = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
        };

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            BackupError::NotificationError(format!(
                "Telegram request failed: {}",
                e.without_url()
            ))
        })?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Telegram sendMessage failed: {} - {}", status, body);
            return Err(BackupError::NotificationError(format!("{}: {}", status, body)));
        }

        Ok(())
    }
}
