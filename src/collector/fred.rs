use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;

use crate::config::FredConfig;
use crate::types::{MetricId, MetricSample};
use super::Collector;

/// FRED series backing each macro metric
pub const SERIES: [(MetricId, &str); 10] = [
    (MetricId::Sofr, "SOFR"),
    (MetricId::Effr, "EFFR"),
    (MetricId::Iorb, "IORB"),
    (MetricId::OnRrp, "RRPONTSYD"),
    (MetricId::Tga, "WTREGEN"),
    (MetricId::Reserves, "RESBALNS"),
    (MetricId::Bgcr, "BGCR"),
    (MetricId::Dgs2, "DGS2"),
    (MetricId::Dgs10, "DGS10"),
    (MetricId::Dtwex, "DTWEXBGS"),
];

const METRICS: [MetricId; 10] = [
    MetricId::Sofr,
    MetricId::Effr,
    MetricId::Iorb,
    MetricId::OnRrp,
    MetricId::Tga,
    MetricId::Reserves,
    MetricId::Bgcr,
    MetricId::Dgs2,
    MetricId::Dgs10,
    MetricId::Dtwex,
];

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    #[serde(default)]
    value: Option<String>,
}

/// Latest value from a FRED observations payload. FRED reports missing
/// days as "."; those, empty strings and unparseable values yield `None`.
pub fn parse_observation(body: &str) -> Option<f64> {
    let response: ObservationsResponse = serde_json::from_str(body).ok()?;
    let raw = response.observations.first()?.value.as_deref()?.trim();
    if raw.is_empty() || raw == "." {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Fetches the latest observation of each configured FRED series
pub struct FredCollector {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl FredCollector {
    pub fn new(config: &FredConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    async fn latest(&self, series_id: &str) -> Result<Option<f64>> {
        let body = self
            .client
            .get(&self.base_url)
            .query(&[
                ("series_id", series_id),
                ("api_key", self.api_key.as_str()),
                ("file_type", "json"),
                ("sort_order", "desc"),
                ("limit", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(parse_observation(&body))
    }
}

#[async_trait]
impl Collector for FredCollector {
    fn name(&self) -> &str { "fred" }

    fn metrics(&self) -> &[MetricId] { &METRICS }

    async fn collect(&mut self) -> Result<Vec<MetricSample>> {
        if self.api_key.is_empty() {
            tracing::warn!("FRED api_key not set, macro metrics unavailable");
            return Ok(Vec::new());
        }

        let mut samples = Vec::with_capacity(SERIES.len());
        for (metric, series_id) in SERIES {
            match self.latest(series_id).await {
                Ok(Some(value)) => samples.push(MetricSample {
                    timestamp: Utc::now(),
                    metric,
                    value,
                }),
                Ok(None) => {
                    tracing::debug!(series = series_id, "No usable observation");
                }
                Err(e) => {
                    tracing::warn!(series = series_id, error = %e, "FRED request failed");
                }
            }
        }

        Ok(samples)
    }
}
