use crate::config::RepoThresholds;
use crate::types::{AxisId, AxisReport, MetricId, MetricVector, Signal};
use super::derivative::spread_of;
use super::rules::{always, classify, Rule};
use super::AxisAnalyzer;

/// Axis C inputs, in percent
pub struct RepoInputs {
    /// BGCR - SOFR
    pub spread: f64,
    /// IORB - SOFR
    pub floor: f64,
    pub wide: f64,
    pub tight: f64,
}

impl RepoInputs {
    pub fn from_vector(vector: &MetricVector, thresholds: &RepoThresholds) -> Option<Self> {
        let bgcr = vector.level(MetricId::Bgcr)?;
        let sofr = vector.level(MetricId::Sofr)?;
        let iorb = vector.level(MetricId::Iorb)?;
        Some(Self {
            spread: spread_of(bgcr, sofr),
            floor: spread_of(iorb, sofr),
            wide: thresholds.wide,
            tight: thresholds.tight,
        })
    }
}

pub const RULES: &[Rule<RepoInputs>] = &[
    Rule {
        name: "repo_dislocation",
        when: |i| i.spread.abs() > i.wide,
        signal: Signal::Negative,
        trigger: Some(|i| format!("C: BGCR-SOFR {:+.2}% (repo dislocation)", i.spread)),
        explain: |_| "C: collateral and cash markets dislocated".to_string(),
    },
    Rule {
        name: "sofr_over_iorb",
        when: |i| i.floor < i.tight,
        signal: Signal::Negative,
        trigger: Some(|i| format!("C: SOFR over IORB ({:+.2}%)", -i.floor)),
        explain: |_| "C: repo trading above IORB, cash scarce".to_string(),
    },
    Rule {
        name: "repo_normal",
        when: always,
        signal: Signal::Inactive,
        trigger: None,
        explain: |i| format!("C: repo spread normal ({:+.2}%)", i.spread),
    },
];

/// Axis C: secured funding spread
pub struct RepoAnalyzer {
    thresholds: RepoThresholds,
}

impl RepoAnalyzer {
    pub fn new(config: &RepoThresholds) -> Self {
        Self { thresholds: *config }
    }
}

impl AxisAnalyzer for RepoAnalyzer {
    fn name(&self) -> &str { "repo" }

    fn axis(&self) -> AxisId { AxisId::C }

    fn analyze(&self, vector: &MetricVector) -> AxisReport {
        match RepoInputs::from_vector(vector, &self.thresholds) {
            Some(inputs) => classify(AxisId::C, RULES, &inputs),
            None => AxisReport::no_data(AxisId::C),
        }
    }
}
