pub mod stdout;
pub mod telegram;
pub mod webhook;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::AlertingConfig;
use crate::storage::{FieldKind, StateKey, StateStore};

const ALERT_BASE: &str = "alert";

/// Trait for alert delivery channels
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// Channel name
    fn name(&self) -> &str;

    /// Deliver one rendered message
    async fn send(&self, message: &str) -> Result<()>;
}

/// Suppresses a message whose content hash matches the last one sent
pub struct AlertDeduplicator<'a> {
    store: &'a mut StateStore,
    now: DateTime<Utc>,
}

impl<'a> AlertDeduplicator<'a> {
    pub fn new(store: &'a mut StateStore, now: DateTime<Utc>) -> Self {
        Self { store, now }
    }

    pub fn digest(message: &str) -> String {
        blake3::hash(message.as_bytes()).to_hex().to_string()
    }

    /// True when the message differs from the last sent one; only then is
    /// the stored hash replaced.
    pub fn should_send(&mut self, message: &str) -> bool {
        let key = StateKey::new(ALERT_BASE, FieldKind::Digest);
        let digest = Self::digest(message);

        if self.store.get_text(&key).as_deref() == Some(digest.as_str()) {
            tracing::info!(digest = %&digest[..12], "Message unchanged since last dispatch, suppressing");
            return false;
        }

        self.store.set_text(&key, &digest, self.now);
        true
    }
}

fn build_channels(
    config: &AlertingConfig,
    hostname: &str,
) -> Vec<(&'static str, Result<Box<dyn AlertChannel>>)> {
    let mut built: Vec<(&'static str, Result<Box<dyn AlertChannel>>)> = Vec::new();

    if let Some(ref tc) = config.telegram {
        if tc.enabled {
            built.push((
                "telegram",
                telegram::TelegramChannel::new(tc).map(|c| Box::new(c) as Box<dyn AlertChannel>),
            ));
        }
    }

    if let Some(ref wc) = config.webhook {
        if wc.enabled {
            built.push((
                "webhook",
                webhook::WebhookChannel::new(wc, hostname).map(|c| Box::new(c) as Box<dyn AlertChannel>),
            ));
        }
    }

    built
}

/// Fans a message out to every configured channel
pub struct AlertManager {
    channels: Vec<Box<dyn AlertChannel>>,
}

impl AlertManager {
    /// Build every enabled channel. A channel that cannot be built is logged
    /// and skipped; with none left the message goes to stdout.
    pub fn new(config: &AlertingConfig, hostname: &str) -> Self {
        let mut channels: Vec<Box<dyn AlertChannel>> = Vec::new();

        for (name, built) in build_channels(config, hostname) {
            match built {
                Ok(channel) => channels.push(channel),
                Err(e) => {
                    tracing::error!(channel = name, error = %e, "Alert channel disabled");
                }
            }
        }

        if channels.is_empty() {
            channels.push(Box::new(stdout::StdoutChannel));
        }

        tracing::info!(channels = channels.len(), "Initialized alert channels");

        Self { channels }
    }

    /// Fails on the first enabled channel that cannot be built
    pub fn check(config: &AlertingConfig, hostname: &str) -> Result<()> {
        for (name, built) in build_channels(config, hostname) {
            built.with_context(|| format!("alerting.{} is enabled but invalid", name))?;
        }
        Ok(())
    }

    pub fn with_channels(channels: Vec<Box<dyn AlertChannel>>) -> Self {
        Self { channels }
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Send to every channel. A failing channel is logged and skipped; the
    /// number of successful deliveries is returned.
    pub async fn dispatch(&self, message: &str) -> usize {
        let mut delivered = 0;
        for channel in &self.channels {
            match channel.send(message).await {
                Ok(()) => {
                    tracing::info!(channel = channel.name(), "Alert dispatched");
                    delivered += 1;
                }
                Err(e) => {
                    tracing::error!(
                        channel = channel.name(),
                        error = %e,
                        "Failed to send alert"
                    );
                }
            }
        }
        delivered
    }
}
