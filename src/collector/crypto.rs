use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;

use crate::config::CryptoConfig;
use crate::types::{MetricId, MetricSample};
use super::Collector;

const METRICS: [MetricId; 5] = [
    MetricId::BtcPrice,
    MetricId::EthPrice,
    MetricId::BtcReturn5,
    MetricId::BtcVolZ,
    MetricId::BtcAccel,
];

/// Return lookback for the momentum read
const RETURN_STEPS: usize = 5;

/// Fewer closes than this give too noisy a volatility baseline
const MIN_CLOSES: usize = 12;

/// Features derived from a run of BTC closes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumFeatures {
    /// Percent return over the last five steps
    pub r5: f64,
    /// Z-score of the latest absolute step return against the window
    pub vol_z: f64,
    /// Change between the last two step returns, in percentage points
    pub acc: f64,
}

pub fn momentum_features(closes: &[f64]) -> Option<MomentumFeatures> {
    if closes.len() < MIN_CLOSES || closes.iter().any(|c| !c.is_finite() || *c <= 0.0) {
        return None;
    }

    let returns: Vec<f64> = closes
        .windows(2)
        .map(|w| (w[1] / w[0] - 1.0) * 100.0)
        .collect();

    let last = *closes.last()?;
    let base = closes[closes.len() - 1 - RETURN_STEPS];
    let r5 = (last / base - 1.0) * 100.0;

    let magnitudes: Vec<f64> = returns.iter().map(|r| r.abs()).collect();
    let n = magnitudes.len() as f64;
    let mean = magnitudes.iter().sum::<f64>() / n;
    let variance = magnitudes.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    let latest = *magnitudes.last()?;
    let vol_z = if stddev < 1e-10 { 0.0 } else { (latest - mean) / stddev };

    let acc = returns[returns.len() - 1] - returns[returns.len() - 2];

    Some(MomentumFeatures { r5, vol_z, acc })
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

/// Close prices out of a klines payload; each row is an array whose fifth
/// element is the close as a decimal string.
pub fn parse_closes(body: &str) -> Result<Vec<f64>> {
    let rows: Vec<Vec<serde_json::Value>> =
        serde_json::from_str(body).context("malformed klines payload")?;

    rows.iter()
        .map(|row| {
            let raw = row
                .get(4)
                .and_then(|v| v.as_str())
                .context("kline row without close")?;
            raw.parse::<f64>().with_context(|| format!("bad close price {:?}", raw))
        })
        .collect()
}

/// Spot prices and BTC momentum features from the Binance REST API
pub struct CryptoCollector {
    base_url: String,
    interval: String,
    window: u32,
    client: reqwest::Client,
}

impl CryptoCollector {
    pub fn new(config: &CryptoConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            interval: config.interval.clone(),
            window: config.window,
            client,
        })
    }

    async fn price(&self, symbol: &str) -> Result<f64> {
        let ticker: TickerPrice = self
            .client
            .get(format!("{}/ticker/price", self.base_url))
            .query(&[("symbol", symbol)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        ticker.price.parse::<f64>()
            .with_context(|| format!("bad {} price {:?}", symbol, ticker.price))
    }

    async fn closes(&self, symbol: &str) -> Result<Vec<f64>> {
        let limit = self.window.to_string();
        let body = self
            .client
            .get(format!("{}/klines", self.base_url))
            .query(&[
                ("symbol", symbol),
                ("interval", self.interval.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_closes(&body)
    }
}

#[async_trait]
impl Collector for CryptoCollector {
    fn name(&self) -> &str { "crypto" }

    fn metrics(&self) -> &[MetricId] { &METRICS }

    async fn collect(&mut self) -> Result<Vec<MetricSample>> {
        let now = Utc::now();
        let mut samples = Vec::with_capacity(METRICS.len());

        for (metric, symbol) in [(MetricId::BtcPrice, "BTCUSDT"), (MetricId::EthPrice, "ETHUSDT")] {
            match self.price(symbol).await {
                Ok(value) => samples.push(MetricSample { timestamp: now, metric, value }),
                Err(e) => tracing::warn!(symbol, error = %e, "Spot price unavailable"),
            }
        }

        match self.closes("BTCUSDT").await {
            Ok(closes) => match momentum_features(&closes) {
                Some(f) => {
                    samples.push(MetricSample { timestamp: now, metric: MetricId::BtcReturn5, value: f.r5 });
                    samples.push(MetricSample { timestamp: now, metric: MetricId::BtcVolZ, value: f.vol_z });
                    samples.push(MetricSample { timestamp: now, metric: MetricId::BtcAccel, value: f.acc });
                }
                None => tracing::warn!(closes = closes.len(), "Not enough klines for momentum features"),
            },
            Err(e) => tracing::warn!(error = %e, "Klines unavailable"),
        }

        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_then(tail: &[f64]) -> Vec<f64> {
        let mut closes = vec![100.0; 20];
        closes.extend_from_slice(tail);
        closes
    }

    #[test]
    fn five_step_return() {
        let closes = flat_then(&[101.0, 102.0, 103.0, 104.0, 110.0]);
        let f = momentum_features(&closes).unwrap();
        assert!((f.r5 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn spike_has_high_vol_z() {
        let mut closes: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 100.0 } else { 100.1 }).collect();
        let last = *closes.last().unwrap();
        closes.push(last * 0.95);
        let f = momentum_features(&closes).unwrap();
        assert!(f.vol_z > 3.0, "vol_z = {}", f.vol_z);
        assert!(f.acc < 0.0);
    }

    #[test]
    fn flat_series_is_calm() {
        let f = momentum_features(&[50.0; 24]).unwrap();
        assert_eq!(f, MomentumFeatures { r5: 0.0, vol_z: 0.0, acc: 0.0 });
    }

    #[test]
    fn short_or_invalid_series_rejected() {
        assert!(momentum_features(&[100.0; 5]).is_none());
        let mut closes = vec![100.0; 20];
        closes[3] = 0.0;
        assert!(momentum_features(&closes).is_none());
    }

    #[test]
    fn parses_kline_closes() {
        let body = r#"[
            [1700000000000, "100.0", "101.0", "99.0", "100.5", "10.0", 1700003599999, "0", 1, "0", "0", "0"],
            [1700003600000, "100.5", "102.0", "100.0", "101.25", "12.0", 1700007199999, "0", 1, "0", "0", "0"]
        ]"#;
        assert_eq!(parse_closes(body).unwrap(), vec![100.5, 101.25]);
        assert!(parse_closes(r#"[[1, "1"]]"#).is_err());
        assert!(parse_closes(r#"{"code":-1121}"#).is_err());
    }
}
