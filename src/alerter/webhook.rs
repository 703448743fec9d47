use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use crate::config::WebhookConfig;
use super::AlertChannel;

/// Custom webhook alert channel
pub struct WebhookChannel {
    url: String,
    hostname: String,
    headers: std::collections::HashMap<String, String>,
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(config: &WebhookConfig, hostname: &str) -> Result<Self> {
        reqwest::Url::parse(&config.url)
            .with_context(|| format!("invalid webhook url {:?}", config.url))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            url: config.url.clone(),
            hostname: hostname.to_string(),
            headers: config.headers.clone(),
            client,
        })
    }
}

#[async_trait]
impl AlertChannel for WebhookChannel {
    fn name(&self) -> &str { "webhook" }

    async fn send(&self, message: &str) -> Result<()> {
        let payload = json!({
            "hostname": &self.hostname,
            "message": message,
            "digest": super::AlertDeduplicator::digest(message),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let mut req = self.client.post(&self.url).json(&payload);
        for (k, v) in &self.headers {
            req = req.header(k, v);
        }

        req.send().await?.error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> WebhookConfig {
        WebhookConfig {
            enabled: true,
            url: url.to_string(),
            headers: Default::default(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn url_must_parse() {
        assert!(WebhookChannel::new(&config("https://hooks.example.com/canary"), "host").is_ok());
        assert!(WebhookChannel::new(&config(""), "host").is_err());
        assert!(WebhookChannel::new(&config("not a url"), "host").is_err());
    }
}
