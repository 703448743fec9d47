use crate::config::CurveThresholds;
use crate::types::{AxisId, AxisReport, MetricId, MetricVector, Observation, Signal};
use super::derivative::spread_of;
use super::rules::{always, classify, Rule};
use super::AxisAnalyzer;

/// Axis D inputs. Trend drives this axis; levels only appear in text.
pub struct CurveInputs {
    pub dgs2: Observation,
    pub dgs10: Observation,
    pub thresholds: CurveThresholds,
}

impl CurveInputs {
    pub fn from_vector(vector: &MetricVector, thresholds: &CurveThresholds) -> Option<Self> {
        Some(Self {
            dgs2: vector.get(MetricId::Dgs2)?,
            dgs10: vector.get(MetricId::Dgs10)?,
            thresholds: *thresholds,
        })
    }

    fn slope_2s10s(&self) -> f64 {
        spread_of(self.dgs10.value, self.dgs2.value)
    }
}

pub const RULES: &[Rule<CurveInputs>] = &[
    Rule {
        name: "front_end_selloff",
        when: |i| i.dgs2.d1 >= i.thresholds.front_end,
        signal: Signal::Negative,
        trigger: Some(|i| format!("D: 2Y {:+.2}pp ({:.2}%)", i.dgs2.d1, i.dgs2.value)),
        explain: |_| "D: front end selling off, tighter policy priced".to_string(),
    },
    Rule {
        name: "front_end_rally",
        when: |i| i.dgs2.d1 <= -i.thresholds.front_end,
        signal: Signal::Positive,
        trigger: Some(|i| format!("D: 2Y {:+.2}pp ({:.2}%)", i.dgs2.d1, i.dgs2.value)),
        explain: |_| "D: front end rallying, easing priced".to_string(),
    },
    Rule {
        name: "long_end_selloff",
        when: |i| i.dgs10.d1 >= i.thresholds.long_end,
        signal: Signal::Negative,
        trigger: Some(|i| format!("D: 10Y {:+.2}pp ({:.2}%)", i.dgs10.d1, i.dgs10.value)),
        explain: |_| "D: long end selling off, term premium rising".to_string(),
    },
    Rule {
        name: "long_end_rally",
        when: |i| i.dgs10.d1 <= -i.thresholds.long_end,
        signal: Signal::Positive,
        trigger: Some(|i| format!("D: 10Y {:+.2}pp ({:.2}%)", i.dgs10.d1, i.dgs10.value)),
        explain: |_| "D: long end rallying".to_string(),
    },
    Rule {
        name: "curve_stable",
        when: always,
        signal: Signal::Inactive,
        trigger: None,
        explain: |i| format!("D: curve stable (2s10s {:+.2})", i.slope_2s10s()),
    },
];

/// Axis D: treasury yield curve
pub struct CurveAnalyzer {
    thresholds: CurveThresholds,
}

impl CurveAnalyzer {
    pub fn new(config: &CurveThresholds) -> Self {
        Self { thresholds: *config }
    }
}

impl AxisAnalyzer for CurveAnalyzer {
    fn name(&self) -> &str { "curve" }

    fn axis(&self) -> AxisId { AxisId::D }

    fn analyze(&self, vector: &MetricVector) -> AxisReport {
        match CurveInputs::from_vector(vector, &self.thresholds) {
            Some(inputs) => classify(AxisId::D, RULES, &inputs),
            None => AxisReport::no_data(AxisId::D),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(dgs2_d1: f64, dgs10_d1: f64) -> CurveInputs {
        CurveInputs {
            dgs2: Observation { value: 4.20, d1: dgs2_d1, d2: 0.0 },
            dgs10: Observation { value: 4.45, d1: dgs10_d1, d2: 0.0 },
            thresholds: CurveThresholds::default(),
        }
    }

    #[test]
    fn flat_moves_are_stable() {
        let report = classify(AxisId::D, RULES, &inputs(0.02, -0.05));
        assert_eq!(report.signal, Signal::Inactive);
        assert_eq!(report.conclusion, "D: curve stable (2s10s +0.25)");
    }

    #[test]
    fn front_end_checked_before_long_end() {
        let report = classify(AxisId::D, RULES, &inputs(-0.15, 0.20));
        assert_eq!(report.signal, Signal::Positive);
        assert_eq!(report.positive.as_deref(), Some("D: 2Y -0.15pp (4.20%)"));
    }

    #[test]
    fn long_end_selloff() {
        let report = classify(AxisId::D, RULES, &inputs(0.0, 0.12));
        assert_eq!(report.signal, Signal::Negative);
        assert_eq!(report.conclusion, "D: long end selling off, term premium rising");
    }

    #[test]
    fn level_alone_never_triggers() {
        let mut i = inputs(0.0, 0.0);
        i.dgs2.value = 9.0;
        assert_eq!(classify(AxisId::D, RULES, &i).signal, Signal::Inactive);
    }
}
