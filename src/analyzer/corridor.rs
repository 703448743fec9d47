use crate::config::CorridorThresholds;
use crate::types::{AxisId, AxisReport, MetricId, MetricVector, Signal};
use super::derivative::spread_of;
use super::rules::{always, classify, Rule};
use super::AxisAnalyzer;

/// Axis A inputs, in percent
pub struct CorridorInputs {
    pub sofr: f64,
    pub effr: f64,
    pub iorb: f64,
    /// SOFR - EFFR
    pub spread: f64,
    /// IORB - EFFR
    pub ceiling: f64,
    pub wide: f64,
    pub tight: f64,
}

impl CorridorInputs {
    pub fn from_vector(vector: &MetricVector, thresholds: &CorridorThresholds) -> Option<Self> {
        let sofr = vector.level(MetricId::Sofr)?;
        let effr = vector.level(MetricId::Effr)?;
        let iorb = vector.level(MetricId::Iorb)?;
        Some(Self {
            sofr,
            effr,
            iorb,
            spread: spread_of(sofr, effr),
            ceiling: spread_of(iorb, effr),
            wide: thresholds.wide,
            tight: thresholds.tight,
        })
    }
}

/// An outright breach outranks ceiling proximity
pub const RULES: &[Rule<CorridorInputs>] = &[
    Rule {
        name: "corridor_breach",
        when: |i| i.spread.abs() > i.wide,
        signal: Signal::Negative,
        trigger: Some(|i| format!("A: SOFR-EFFR {:+.2}% (corridor breach)", i.spread)),
        explain: |_| "A: policy corridor stressed".to_string(),
    },
    Rule {
        name: "effr_abutting_iorb",
        when: |i| i.ceiling < i.tight,
        signal: Signal::Negative,
        trigger: Some(|i| format!("A: EFFR≈IORB ({:+.2}%)", i.ceiling)),
        explain: |_| "A: pressure at the corridor ceiling".to_string(),
    },
    Rule {
        name: "corridor_normal",
        when: always,
        signal: Signal::Inactive,
        trigger: None,
        explain: |i| format!("A: policy corridor normal (SOFR {:.2} / EFFR {:.2} / IORB {:.2})", i.sofr, i.effr, i.iorb),
    },
];

/// Axis A: policy-rate corridor
pub struct CorridorAnalyzer {
    thresholds: CorridorThresholds,
}

impl CorridorAnalyzer {
    pub fn new(config: &CorridorThresholds) -> Self {
        Self { thresholds: *config }
    }
}

impl AxisAnalyzer for CorridorAnalyzer {
    fn name(&self) -> &str { "corridor" }

    fn axis(&self) -> AxisId { AxisId::A }

    fn analyze(&self, vector: &MetricVector) -> AxisReport {
        match CorridorInputs::from_vector(vector, &self.thresholds) {
            Some(inputs) => classify(AxisId::A, RULES, &inputs),
            None => AxisReport::no_data(AxisId::A),
        }
    }
}
