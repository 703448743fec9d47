pub mod crypto;
pub mod fred;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::types::{MetricId, MetricSample, Snapshot};

/// Trait for all metric collectors.
///
/// Each collector owns a fixed set of metric keys and fetches their latest
/// values from one upstream source. A key the collector cannot fetch is
/// simply left out of the returned samples.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Human-readable name for this collector (e.g., "fred", "crypto")
    fn name(&self) -> &str;

    /// Metric keys this collector is responsible for
    fn metrics(&self) -> &[MetricId];

    /// Fetch the current values. An error marks every owned key unavailable.
    async fn collect(&mut self) -> Result<Vec<MetricSample>>;
}

/// Create all enabled collectors based on configuration
pub fn create_collectors(config: &Config) -> Result<Vec<Box<dyn Collector>>> {
    let mut collectors: Vec<Box<dyn Collector>> = Vec::new();

    if config.sources.fred.enabled {
        collectors.push(Box::new(fred::FredCollector::new(&config.sources.fred)?));
    }

    if config.sources.crypto.enabled {
        collectors.push(Box::new(crypto::CryptoCollector::new(&config.sources.crypto)?));
    }

    tracing::info!(count = collectors.len(), "Initialized collectors");
    Ok(collectors)
}

/// Run every collector once and assemble the run's snapshot. Owned keys
/// start out unavailable and are filled from whatever the collector returned.
pub async fn collect_snapshot(collectors: &mut [Box<dyn Collector>]) -> Snapshot {
    let mut snapshot = Snapshot::new();

    for collector in collectors.iter_mut() {
        for metric in collector.metrics() {
            snapshot.mark_unavailable(*metric);
        }

        match collector.collect().await {
            Ok(samples) => {
                tracing::debug!(
                    collector = collector.name(),
                    samples = samples.len(),
                    "Collected"
                );
                for sample in samples {
                    snapshot.insert(sample.metric, sample.value);
                }
            }
            Err(e) => {
                tracing::warn!(
                    collector = collector.name(),
                    error = %e,
                    "Collection failed, metrics unavailable this run"
                );
            }
        }
    }

    snapshot
}
