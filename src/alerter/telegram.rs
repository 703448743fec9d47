use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use crate::config::TelegramConfig;
use super::AlertChannel;

/// Bot API rejects longer message bodies
const MAX_MESSAGE_CHARS: usize = 4096;

/// Telegram Bot API channel
pub struct TelegramChannel {
    endpoint: String,
    chat_id: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        if config.bot_token.is_empty() || config.chat_id.is_empty() {
            bail!("telegram channel requires bot_token and chat_id");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_url.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id.clone(),
            client,
        })
    }
}

fn truncate(message: &str) -> String {
    if message.chars().count() <= MAX_MESSAGE_CHARS {
        return message.to_string();
    }
    let mut out: String = message.chars().take(MAX_MESSAGE_CHARS - 1).collect();
    out.push('…');
    out
}

#[async_trait]
impl AlertChannel for TelegramChannel {
    fn name(&self) -> &str { "telegram" }

    async fn send(&self, message: &str) -> Result<()> {
        let payload = json!({
            "chat_id": &self.chat_id,
            "text": truncate(message),
            "disable_web_page_preview": true,
        });

        let resp = self.client.post(&self.endpoint).json(&payload).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("telegram sendMessage failed with {}: {}", status, body);
        }
        Ok(())
    }
}
