use crate::config::MomentumThresholds;
use crate::types::{AxisId, AxisReport, MetricId, MetricVector, Signal};

/// Axis outcomes indexed by [`AxisId::index`]
pub type Outcomes = [Signal; 5];

pub fn outcomes(reports: &[AxisReport]) -> Outcomes {
    let mut out = [Signal::NoData; 5];
    for report in reports {
        out[report.axis.index()] = report.signal;
    }
    out
}

pub struct RegimeRule {
    pub label: &'static str,
    pub when: fn(&Outcomes) -> bool,
}

fn is(o: &Outcomes, axis: AxisId, signal: Signal) -> bool {
    o[axis.index()] == signal
}

/// First match wins; rows are ordered by axis priority, never by magnitude.
pub const REGIMES: &[RegimeRule] = &[
    RegimeRule {
        label: "Funding Stress",
        when: |o| {
            is(o, AxisId::A, Signal::Negative)
                && (is(o, AxisId::B, Signal::Negative) || is(o, AxisId::C, Signal::Negative))
        },
    },
    RegimeRule { label: "Corridor Pressure", when: |o| is(o, AxisId::A, Signal::Negative) },
    RegimeRule { label: "Liquidity Drain", when: |o| is(o, AxisId::B, Signal::Negative) },
    RegimeRule { label: "Repo Stress", when: |o| is(o, AxisId::C, Signal::Negative) },
    RegimeRule { label: "Liquidity Release", when: |o| is(o, AxisId::B, Signal::Positive) },
    RegimeRule {
        label: "Tightening",
        when: |o| is(o, AxisId::D, Signal::Negative) && is(o, AxisId::E, Signal::Negative),
    },
    RegimeRule {
        label: "Easing",
        when: |o| is(o, AxisId::D, Signal::Positive) && is(o, AxisId::E, Signal::Positive),
    },
    RegimeRule { label: "No Data", when: |o| o.iter().all(|s| *s == Signal::NoData) },
    RegimeRule { label: "Neutral", when: |_| true },
];

pub fn classify_regime(outcomes: &Outcomes) -> &'static str {
    REGIMES
        .iter()
        .find(|rule| (rule.when)(outcomes))
        .map_or("Neutral", |rule| rule.label)
}

/// Crypto momentum read from BTC 5-step return and volatility z-score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Momentum {
    RiskOn,
    RiskOff,
    Neutral,
    NoData,
}

impl std::fmt::Display for Momentum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Momentum::RiskOn => write!(f, "Risk-On"),
            Momentum::RiskOff => write!(f, "Risk-Off"),
            Momentum::Neutral => write!(f, "Neutral"),
            Momentum::NoData => write!(f, "no data"),
        }
    }
}

pub fn momentum_regime(vector: &MetricVector, thresholds: &MomentumThresholds) -> Momentum {
    let (Some(r5), Some(vol)) = (vector.level(MetricId::BtcReturn5), vector.level(MetricId::BtcVolZ)) else {
        return Momentum::NoData;
    };

    if r5 > thresholds.return_pct && vol < thresholds.vol_z {
        Momentum::RiskOn
    } else if r5 < -thresholds.return_pct && vol > thresholds.vol_z {
        Momentum::RiskOff
    } else {
        Momentum::Neutral
    }
}
