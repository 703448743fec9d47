//! One evaluation cycle: snapshot in, rendered message and send decision out.

use chrono::{DateTime, Utc};

use crate::alerter::AlertDeduplicator;
use crate::analyzer::regime::{self, Momentum};
use crate::analyzer::{self, AxisAnalyzer, DerivativeTracker};
use crate::config::{Config, MomentumThresholds, RenderConfig};
use crate::signal::{render_message, Aggregate, MessageView, SignalAggregator};
use crate::storage::StateStore;
use crate::types::{AxisReport, MetricVector, Snapshot};

/// Result of a single run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub message: String,
    pub regime: &'static str,
    pub momentum: Momentum,
    pub reports: Vec<AxisReport>,
    pub aggregate: Aggregate,
    pub vector: MetricVector,
    /// False when the message repeats the last one sent
    pub should_send: bool,
}

pub struct Canary {
    analyzers: Vec<Box<dyn AxisAnalyzer>>,
    aggregator: SignalAggregator,
    momentum: MomentumThresholds,
    render: RenderConfig,
}

impl Canary {
    pub fn new(config: &Config) -> Self {
        Self {
            analyzers: analyzer::create_analyzers(&config.thresholds),
            aggregator: SignalAggregator::new(&config.signal),
            momentum: config.thresholds.momentum,
            render: config.render.clone(),
        }
    }

    /// Evaluate a snapshot against persisted state. With `dedup` unset the
    /// stored alert hash is neither consulted nor replaced.
    pub fn run(
        &self,
        store: &mut StateStore,
        snapshot: &Snapshot,
        now: DateTime<Utc>,
        dedup: bool,
    ) -> RunReport {
        let vector = DerivativeTracker::new(store, now).track(snapshot);
        let reports = analyzer::classify_axes(&self.analyzers, &vector);
        let regime = regime::classify_regime(&regime::outcomes(&reports));
        let momentum = regime::momentum_regime(&vector, &self.momentum);
        let aggregate = self.aggregator.aggregate(store, &reports, now);

        let message = render_message(
            &self.render,
            &MessageView { regime, momentum, aggregate: &aggregate, vector: &vector },
        );

        let should_send = !dedup || AlertDeduplicator::new(store, now).should_send(&message);

        tracing::info!(
            regime,
            momentum = %momentum,
            direction = %aggregate.streak.direction,
            streak = aggregate.streak.count,
            sustained = aggregate.sustained,
            should_send,
            "Run evaluated"
        );

        RunReport { message, regime, momentum, reports, aggregate, vector, should_send }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, MetricId, Signal};

    fn baseline() -> Snapshot {
        Snapshot::from_values(&[
            (MetricId::Sofr, 5.31),
            (MetricId::Effr, 5.33),
            (MetricId::Iorb, 5.40),
            (MetricId::Bgcr, 5.30),
        ])
    }

    #[test]
    fn empty_snapshot_is_no_data() {
        let canary = Canary::new(&Config::default());
        let mut store = StateStore::in_memory();
        let report = canary.run(&mut store, &Snapshot::new(), Utc::now(), true);

        assert_eq!(report.regime, "No Data");
        assert_eq!(report.momentum, Momentum::NoData);
        assert!(report.reports.iter().all(|r| r.signal == Signal::NoData));
        assert!(report.should_send);
    }

    #[test]
    fn repeat_run_is_suppressed() {
        let canary = Canary::new(&Config::default());
        let mut store = StateStore::in_memory();

        // unchanged levels keep every delta at zero, so the text repeats
        let first = canary.run(&mut store, &baseline(), Utc::now(), true);
        let second = canary.run(&mut store, &baseline(), Utc::now(), true);
        assert!(first.should_send);
        assert_eq!(first.message, second.message);
        assert!(!second.should_send);

        let mut moved = baseline();
        moved.insert(MetricId::Bgcr, 5.32);
        assert!(canary.run(&mut store, &moved, Utc::now(), true).should_send);
    }

    #[test]
    fn without_dedup_always_sends() {
        let canary = Canary::new(&Config::default());
        let mut store = StateStore::in_memory();
        for _ in 0..3 {
            assert!(canary.run(&mut store, &baseline(), Utc::now(), false).should_send);
        }
    }

    #[test]
    fn corridor_breach_reads_tight() {
        let canary = Canary::new(&Config::default());
        let mut store = StateStore::in_memory();
        let snapshot = Snapshot::from_values(&[
            (MetricId::Sofr, 5.45),
            (MetricId::Effr, 5.33),
            (MetricId::Iorb, 5.40),
        ]);

        let report = canary.run(&mut store, &snapshot, Utc::now(), true);
        assert_eq!(report.regime, "Corridor Pressure");
        assert_eq!(report.aggregate.streak.direction, Direction::Tight);
        assert!(report.message.contains("Regime: Corridor Pressure"));
    }
}
