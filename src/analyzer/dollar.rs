use crate::config::DollarThresholds;
use crate::types::{AxisId, AxisReport, MetricId, MetricVector, Observation, Signal};
use super::rules::{always, classify, Rule};
use super::AxisAnalyzer;

pub struct DollarInputs {
    pub index: Observation,
    pub change: f64,
}

pub const RULES: &[Rule<DollarInputs>] = &[
    Rule {
        name: "dollar_strengthening",
        when: |i| i.index.d1 >= i.change,
        signal: Signal::Negative,
        trigger: Some(|i| format!("E: broad USD {:+.2} ({:.2})", i.index.d1, i.index.value)),
        explain: |_| "E: dollar strengthening, global liquidity tighter".to_string(),
    },
    Rule {
        name: "dollar_weakening",
        when: |i| i.index.d1 <= -i.change,
        signal: Signal::Positive,
        trigger: Some(|i| format!("E: broad USD {:+.2} ({:.2})", i.index.d1, i.index.value)),
        explain: |_| "E: dollar weakening, global liquidity looser".to_string(),
    },
    Rule {
        name: "dollar_stable",
        when: always,
        signal: Signal::Inactive,
        trigger: None,
        explain: |_| "E: dollar stable".to_string(),
    },
];

/// Axis E: trade-weighted dollar index trend
pub struct DollarAnalyzer {
    thresholds: DollarThresholds,
}

impl DollarAnalyzer {
    pub fn new(config: &DollarThresholds) -> Self {
        Self { thresholds: *config }
    }
}

impl AxisAnalyzer for DollarAnalyzer {
    fn name(&self) -> &str { "dollar" }

    fn axis(&self) -> AxisId { AxisId::E }

    fn analyze(&self, vector: &MetricVector) -> AxisReport {
        match vector.get(MetricId::Dtwex) {
            Some(index) => classify(
                AxisId::E,
                RULES,
                &DollarInputs { index, change: self.thresholds.change },
            ),
            None => AxisReport::no_data(AxisId::E),
        }
    }
}
