pub mod corridor;
pub mod curve;
pub mod derivative;
pub mod dollar;
pub mod liquidity;
pub mod regime;
pub mod repo;
pub mod rules;

use crate::config::ThresholdConfig;
use crate::types::{AxisId, AxisReport, MetricVector};

pub use derivative::DerivativeTracker;

/// Trait for per-axis threshold classifiers.
///
/// Each analyzer reads the levels and derivatives it needs from the metric
/// vector and always produces a report, `NoData` included.
pub trait AxisAnalyzer: Send + Sync {
    /// Human-readable name for this analyzer
    fn name(&self) -> &str;

    /// Axis this analyzer reports on
    fn axis(&self) -> AxisId;

    fn analyze(&self, vector: &MetricVector) -> AxisReport;
}

/// Create one analyzer per axis, in priority order
pub fn create_analyzers(config: &ThresholdConfig) -> Vec<Box<dyn AxisAnalyzer>> {
    let analyzers: Vec<Box<dyn AxisAnalyzer>> = vec![
        Box::new(corridor::CorridorAnalyzer::new(&config.corridor)),
        Box::new(liquidity::LiquidityAnalyzer::new(&config.liquidity)),
        Box::new(repo::RepoAnalyzer::new(&config.repo)),
        Box::new(curve::CurveAnalyzer::new(&config.curve)),
        Box::new(dollar::DollarAnalyzer::new(&config.dollar)),
    ];

    tracing::debug!(count = analyzers.len(), "Initialized analyzers");
    analyzers
}

/// Evaluate every axis. The result holds exactly one report per axis in
/// A..E order; an axis without an analyzer reports no data.
pub fn classify_axes(analyzers: &[Box<dyn AxisAnalyzer>], vector: &MetricVector) -> Vec<AxisReport> {
    AxisId::ALL
        .iter()
        .map(|axis| {
            match analyzers.iter().find(|a| a.axis() == *axis) {
                Some(analyzer) => {
                    let report = analyzer.analyze(vector);
                    tracing::debug!(
                        analyzer = analyzer.name(),
                        signal = ?report.signal,
                        "Axis classified"
                    );
                    report
                }
                None => AxisReport::no_data(*axis),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Signal;

    #[test]
    fn one_report_per_axis_in_order() {
        let analyzers = create_analyzers(&ThresholdConfig::default());
        let reports = classify_axes(&analyzers, &MetricVector::default());

        let axes: Vec<AxisId> = reports.iter().map(|r| r.axis).collect();
        assert_eq!(axes, AxisId::ALL.to_vec());
        assert!(reports.iter().all(|r| r.signal == Signal::NoData));
    }

    #[test]
    fn missing_analyzer_reports_no_data() {
        let analyzers: Vec<Box<dyn AxisAnalyzer>> =
            vec![Box::new(dollar::DollarAnalyzer::new(&Default::default()))];
        let reports = classify_axes(&analyzers, &MetricVector::default());
        assert_eq!(reports.len(), 5);
        assert_eq!(reports[0].conclusion, "A: no data");
    }
}
