// src/services/notifier.rs

//! Telegram notification dispatch.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::{ParsedItem, TelegramConfig};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Outbound notification sink for new items.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one notification for a new item.
    async fn notify(&self, item: &ParsedItem) -> Result<()>;
}

/// Notifier backed by the Telegram Bot API.
pub struct TelegramNotifier {
    client: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            TELEGRAM_API_BASE, self.config.bot_token
        )
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        if self.config.bot_token.is_empty() || self.config.chat_id.is_empty() {
            return Err(AppError::notify(
                "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID are required",
            ));
        }

        let payload = json!({
            "chat_id": self.config.chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });

        let response = self
            .client
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::notify(format!(
                "Telegram API returned HTTP {}",
                response.status()
            )));
        }

        // Post-send delay, the only outbound rate limit.
        tokio::time::sleep(Duration::from_secs(self.config.send_delay_secs)).await;
        Ok(())
    }

    /// Announce daemon startup to the configured chat.
    pub async fn announce_start(&self) -> Result<()> {
        self.send_text("Page watcher started").await?;
        log::info!("Sent startup message");
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, item: &ParsedItem) -> Result<()> {
        self.send_text(&item.notification_text()).await?;
        log::info!("Sent alert for: {}", item.title);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_item() -> ParsedItem {
        ParsedItem {
            title: "New post".to_string(),
            link: Some("https://example.com/1".to_string()),
            content: "body".to_string(),
            identity_hash: "0".repeat(64),
        }
    }

    #[test]
    fn test_endpoint_embeds_token() {
        let notifier = TelegramNotifier::new(TelegramConfig {
            bot_token: "123:abc".to_string(),
            chat_id: "42".to_string(),
            send_delay_secs: 0,
        })
        .unwrap();

        assert_eq!(
            notifier.endpoint(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[tokio::test]
    async fn test_missing_credentials_is_notify_error() {
        let notifier = TelegramNotifier::new(TelegramConfig::default()).unwrap();
        let error = notifier.notify(&make_item()).await.unwrap_err();
        assert!(matches!(error, AppError::Notify(_)));
    }
}
