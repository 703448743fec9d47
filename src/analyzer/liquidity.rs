use crate::config::LiquidityThresholds;
use crate::types::{AxisId, AxisReport, MetricId, MetricVector, Observation, Signal};
use super::rules::{first_match, Rule};
use super::AxisAnalyzer;

/// Axis B inputs: reverse-repo, Treasury General Account and reserve balances
/// with their per-run differences
pub struct FlowInputs {
    pub rrp: Observation,
    pub tga: Observation,
    pub reserves: Observation,
    pub thresholds: LiquidityThresholds,
}

impl FlowInputs {
    pub fn from_vector(vector: &MetricVector, thresholds: &LiquidityThresholds) -> Option<Self> {
        Some(Self {
            rrp: vector.get(MetricId::OnRrp)?,
            tga: vector.get(MetricId::Tga)?,
            reserves: vector.get(MetricId::Reserves)?,
            thresholds: *thresholds,
        })
    }
}

fn accel(o: &Observation) -> &'static str {
    if o.d1 * o.d2 > 0.0 {
        ", accelerating"
    } else {
        ""
    }
}

/// Liquidity leaving the system
pub const DRAIN: &[Rule<FlowInputs>] = &[
    Rule {
        name: "tga_rebuild",
        when: |i| i.tga.d1 > i.thresholds.tga_flow,
        signal: Signal::Negative,
        trigger: Some(|i| format!("B: TGA {:+.0}{}", i.tga.d1, accel(&i.tga))),
        explain: |_| "Treasury cash build drains reserves".to_string(),
    },
    Rule {
        name: "reserves_drain",
        when: |i| i.reserves.d1 < -i.thresholds.reserves_flow,
        signal: Signal::Negative,
        trigger: Some(|i| format!("B: reserves {:+.0}{}", i.reserves.d1, accel(&i.reserves))),
        explain: |_| "bank reserves falling".to_string(),
    },
];

/// Liquidity entering the system
pub const RELEASE: &[Rule<FlowInputs>] = &[
    Rule {
        name: "rrp_drawdown",
        when: |i| i.rrp.d1 < -i.thresholds.rrp_flow,
        signal: Signal::Positive,
        trigger: Some(|i| format!("B: RRP {:+.0}{}", i.rrp.d1, accel(&i.rrp))),
        explain: |_| "reverse repo drawdown releases liquidity".to_string(),
    },
    Rule {
        name: "reserves_release",
        when: |i| i.reserves.d1 > i.thresholds.reserves_flow,
        signal: Signal::Positive,
        trigger: Some(|i| format!("B: reserves {:+.0}{}", i.reserves.d1, accel(&i.reserves))),
        explain: |_| "bank reserves rising".to_string(),
    },
];

/// Axis B: balance-sheet flows. Drain and release are judged independently
/// and may both register.
pub struct LiquidityAnalyzer {
    thresholds: LiquidityThresholds,
}

impl LiquidityAnalyzer {
    pub fn new(config: &LiquidityThresholds) -> Self {
        Self { thresholds: *config }
    }

    pub fn evaluate(inputs: &FlowInputs) -> AxisReport {
        let drain = first_match(DRAIN, inputs);
        let release = first_match(RELEASE, inputs);

        let negative = drain.and_then(|r| r.trigger_text(inputs));
        let positive = release.and_then(|r| r.trigger_text(inputs));

        let (signal, conclusion) = match (drain, release) {
            (Some(d), Some(r)) => (
                Signal::Mixed,
                format!("B: mixed, {} vs {}", (d.explain)(inputs), (r.explain)(inputs)),
            ),
            (Some(d), None) => (Signal::Negative, format!("B: {}", (d.explain)(inputs))),
            (None, Some(r)) => (Signal::Positive, format!("B: {}", (r.explain)(inputs))),
            (None, None) => (
                Signal::Inactive,
                format!(
                    "B: liquidity flows quiet (RRP={:.0} | TGA={:.0} | reserves={:.0})",
                    inputs.rrp.value, inputs.tga.value, inputs.reserves.value
                ),
            ),
        };

        AxisReport { axis: AxisId::B, signal, positive, negative, conclusion }
    }
}

impl AxisAnalyzer for LiquidityAnalyzer {
    fn name(&self) -> &str { "liquidity" }

    fn axis(&self) -> AxisId { AxisId::B }

    fn analyze(&self, vector: &MetricVector) -> AxisReport {
        match FlowInputs::from_vector(vector, &self.thresholds) {
            Some(inputs) => Self::evaluate(&inputs),
            None => AxisReport::no_data(AxisId::B),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(value: f64, d1: f64, d2: f64) -> Observation {
        Observation { value, d1, d2 }
    }

    fn inputs(rrp_d1: f64, tga_d1: f64, reserves_d1: f64) -> FlowInputs {
        FlowInputs {
            rrp: obs(400.0, rrp_d1, 0.0),
            tga: obs(750_000.0, tga_d1, 0.0),
            reserves: obs(3_200.0, reserves_d1, 0.0),
            thresholds: LiquidityThresholds::default(),
        }
    }

    #[test]
    fn quiet_when_nothing_moves() {
        let report = LiquidityAnalyzer::evaluate(&inputs(0.0, 0.0, 0.0));
        assert_eq!(report.signal, Signal::Inactive);
        assert_eq!(report.conclusion, "B: liquidity flows quiet (RRP=400 | TGA=750000 | reserves=3200)");
    }

    #[test]
    fn tga_build_is_drain() {
        let report = LiquidityAnalyzer::evaluate(&inputs(0.0, 80_000.0, 0.0));
        assert_eq!(report.signal, Signal::Negative);
        assert_eq!(report.negative.as_deref(), Some("B: TGA +80000"));
        assert_eq!(report.positive, None);
    }

    #[test]
    fn rrp_drawdown_is_release() {
        let report = LiquidityAnalyzer::evaluate(&inputs(-120.0, 0.0, 0.0));
        assert_eq!(report.signal, Signal::Positive);
        assert_eq!(report.positive.as_deref(), Some("B: RRP -120"));
    }

    #[test]
    fn drain_and_release_together_are_mixed() {
        let report = LiquidityAnalyzer::evaluate(&inputs(-120.0, 80_000.0, 0.0));
        assert_eq!(report.signal, Signal::Mixed);
        assert!(report.positive.is_some());
        assert!(report.negative.is_some());
        assert!(report.conclusion.starts_with("B: mixed"));
    }

    #[test]
    fn same_sign_acceleration_is_annotated() {
        let mut i = inputs(0.0, 0.0, -80.0);
        i.reserves.d2 = -30.0;
        let report = LiquidityAnalyzer::evaluate(&i);
        assert_eq!(report.negative.as_deref(), Some("B: reserves -80, accelerating"));
    }

    #[test]
    fn missing_balance_is_no_data() {
        let mut v = MetricVector::default();
        v.insert(MetricId::OnRrp, obs(400.0, 0.0, 0.0));
        v.insert(MetricId::Tga, obs(750_000.0, 0.0, 0.0));
        let report = LiquidityAnalyzer::new(&LiquidityThresholds::default()).analyze(&v);
        assert_eq!(report.signal, Signal::NoData);
    }
}
