//! Combines axis reports into the rendered alert and keeps the distortion
//! streak that separates transient noise from a persisted condition.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;

use crate::analyzer::regime::Momentum;
use crate::config::{RenderConfig, SignalConfig};
use crate::storage::{FieldKind, StateKey, StateStore};
use crate::types::{AxisId, AxisReport, Direction, MetricId, MetricVector, Observation};

const STREAK_BASE: &str = "distortion_streak";

/// Consecutive runs with the same non-neutral net direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Streak {
    pub direction: Direction,
    pub count: u32,
}

/// Everything the message needs from the aggregation step
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub positive_line: String,
    pub negative_line: String,
    pub conclusion: String,
    pub streak: Streak,
    pub sustained: bool,
}

pub struct SignalAggregator {
    sustained_runs: u32,
}

impl SignalAggregator {
    pub fn new(config: &SignalConfig) -> Self {
        Self { sustained_runs: config.sustained_runs }
    }

    /// One slot per axis in A..E order; an axis with nothing on that side reads "None"
    pub fn trigger_lines(reports: &[AxisReport]) -> (String, String) {
        let line = |positive: bool| {
            AxisId::ALL
                .iter()
                .map(|axis| {
                    reports
                        .iter()
                        .find(|r| r.axis == *axis)
                        .and_then(|r| if positive { r.positive.clone() } else { r.negative.clone() })
                        .unwrap_or_else(|| format!("{}: None", axis))
                })
                .collect::<Vec<_>>()
        };

        let positive = line(true);
        let negative = line(false);
        (positive.join(" | "), negative.join(" | "))
    }

    pub fn conclusion(reports: &[AxisReport]) -> String {
        AxisId::ALL
            .iter()
            .map(|axis| {
                reports
                    .iter()
                    .find(|r| r.axis == *axis)
                    .map(|r| r.conclusion.clone())
                    .unwrap_or_else(|| format!("{}: no data", axis))
            })
            .collect::<Vec<_>>()
            .join(" / ")
    }

    /// Sign of the summed votes of active axes
    pub fn net_direction(reports: &[AxisReport]) -> Direction {
        let net: i32 = reports.iter().filter_map(|r| r.signal.vote()).sum();
        Direction::from_net(net)
    }

    /// Advance the persisted streak with this run's direction
    pub fn update_streak(store: &mut StateStore, direction: Direction, now: DateTime<Utc>) -> Streak {
        let dir_key = StateKey::new(STREAK_BASE, FieldKind::Direction);
        let count_key = StateKey::new(STREAK_BASE, FieldKind::Count);

        let prev_direction = store.get_text(&dir_key).and_then(|s| Direction::parse(&s));
        let prev_count = store
            .get_num(&count_key)
            .map(|c| c.max(0.0).min(u32::MAX as f64) as u32)
            .unwrap_or(0);

        let count = match direction {
            Direction::Neutral => 0,
            d if prev_direction == Some(d) => prev_count.saturating_add(1),
            _ => 1,
        };

        store.set_text(&dir_key, direction.as_str(), now);
        store.set_num(&count_key, count as f64, now);

        tracing::debug!(
            direction = %direction,
            previous = ?prev_direction,
            count,
            "Updated distortion streak"
        );
        Streak { direction, count }
    }

    pub fn is_sustained(&self, streak: &Streak) -> bool {
        streak.direction != Direction::Neutral && streak.count >= self.sustained_runs
    }

    pub fn aggregate(&self, store: &mut StateStore, reports: &[AxisReport], now: DateTime<Utc>) -> Aggregate {
        let (positive_line, negative_line) = Self::trigger_lines(reports);
        let streak = Self::update_streak(store, Self::net_direction(reports), now);
        let sustained = self.is_sustained(&streak);

        let mut conclusion = Self::conclusion(reports);
        // no run count in the text: identical inputs render identical messages
        if sustained {
            let _ = write!(
                conclusion,
                "; sustained {} distortion ({}+ runs)",
                streak.direction, self.sustained_runs
            );
        }

        Aggregate { positive_line, negative_line, conclusion, streak, sustained }
    }
}

/// Inputs to the rendered message beyond the aggregate
pub struct MessageView<'a> {
    pub regime: &'a str,
    pub momentum: Momentum,
    pub aggregate: &'a Aggregate,
    pub vector: &'a MetricVector,
}

/// Render the alert. Contains no timestamps, so identical inputs render
/// byte-identical text.
pub fn render_message(config: &RenderConfig, view: &MessageView<'_>) -> String {
    let agg = view.aggregate;
    let mut msg = String::new();

    let _ = writeln!(msg, "[{}]", config.title);
    let _ = writeln!(msg, "Regime: {} | Momentum: {}", view.regime, view.momentum);
    let _ = write!(msg, "Streak: {}", agg.streak.direction);
    if agg.sustained {
        msg.push_str(" (sustained)");
    }
    msg.push_str("\n\n");

    let _ = writeln!(msg, "[Trigger]");
    let _ = writeln!(msg, "+ {}", agg.positive_line);
    let _ = writeln!(msg, "- {}", agg.negative_line);
    msg.push('\n');

    let _ = writeln!(msg, "[Momentum]");
    let _ = writeln!(msg, "{}", momentum_line(view.vector));
    msg.push('\n');

    let _ = writeln!(msg, "[Conclusion]");
    let _ = write!(msg, "{}", agg.conclusion);

    if config.include_axis_values {
        msg.push_str("\n\n[Axis Values]");
        for metric in MetricId::OBSERVED.iter().chain(MetricId::DERIVED.iter().map(|(m, _, _)| m)) {
            match view.vector.get(*metric) {
                Some(o) => {
                    let _ = write!(msg, "\n{}", axis_value_line(*metric, &o));
                }
                None if MetricId::OBSERVED.contains(metric) => {
                    let _ = write!(msg, "\n{}=n/a", metric);
                }
                None => {}
            }
        }
    }

    msg
}

fn momentum_line(vector: &MetricVector) -> String {
    let (Some(r5), Some(vol), Some(acc)) = (
        vector.level(MetricId::BtcReturn5),
        vector.level(MetricId::BtcVolZ),
        vector.level(MetricId::BtcAccel),
    ) else {
        return "no data".to_string();
    };

    let mut line = format!("BTC_R5={:.2}% | VOL={:.2}σ | ACC={:.2}", r5, vol, acc);
    if let Some(eth) = vector.get(MetricId::EthPrice) {
        let prev = eth.value - eth.d1;
        let step = if prev != 0.0 { eth.d1 / prev * 100.0 } else { 0.0 };
        let _ = write!(line, " | ETH_R1={:.2}%", step);
    }
    line
}

fn axis_value_line(metric: MetricId, o: &Observation) -> String {
    let p = precision(o.value);
    format!("{}={:.p$} Δ={:+.p$} ΔΔ={:+.p$}", metric, o.value, o.d1, o.d2, p = p)
}

/// Balances in millions print whole, rates print to the hundredth of a basis point
fn precision(value: f64) -> usize {
    match value.abs() {
        v if v >= 1000.0 => 0,
        v if v >= 100.0 => 2,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Signal;

    fn report(axis: AxisId, signal: Signal) -> AxisReport {
        let text = Some(format!("{}: fired", axis));
        AxisReport {
            axis,
            signal,
            positive: if signal == Signal::Positive { text.clone() } else { None },
            negative: if signal == Signal::Negative { text } else { None },
            conclusion: format!("{}: explained", axis),
        }
    }

    fn reports(signals: [Signal; 5]) -> Vec<AxisReport> {
        AxisId::ALL.iter().zip(signals).map(|(a, s)| report(*a, s)).collect()
    }

    #[test]
    fn trigger_lines_hold_one_slot_per_axis() {
        use crate::types::Signal::*;
        let (pos, neg) = SignalAggregator::trigger_lines(&reports([Negative, Positive, Inactive, NoData, Inactive]));
        assert_eq!(pos, "A: None | B: fired | C: None | D: None | E: None");
        assert_eq!(neg, "A: fired | B: None | C: None | D: None | E: None");
    }

    #[test]
    fn conclusion_follows_axis_order() {
        let mut rs = reports([Signal::Inactive; 5]);
        rs.reverse();
        assert_eq!(
            SignalAggregator::conclusion(&rs),
            "A: explained / B: explained / C: explained / D: explained / E: explained"
        );
        assert_eq!(
            SignalAggregator::conclusion(&rs[..1]),
            "A: no data / B: no data / C: no data / D: no data / E: explained"
        );
    }

    #[test]
    fn net_direction_excludes_inactive_and_missing() {
        use crate::types::Signal::*;
        assert_eq!(SignalAggregator::net_direction(&reports([Negative, Inactive, NoData, Inactive, Inactive])), Direction::Tight);
        assert_eq!(SignalAggregator::net_direction(&reports([Negative, Positive, Inactive, Positive, Inactive])), Direction::Easy);
        assert_eq!(SignalAggregator::net_direction(&reports([Negative, Mixed, Positive, Inactive, Inactive])), Direction::Neutral);
    }

    #[test]
    fn streak_counts_consecutive_runs() {
        let mut store = StateStore::in_memory();
        let now = Utc::now();

        for n in 1..=4 {
            let streak = SignalAggregator::update_streak(&mut store, Direction::Tight, now);
            assert_eq!(streak, Streak { direction: Direction::Tight, count: n });
        }

        let flipped = SignalAggregator::update_streak(&mut store, Direction::Easy, now);
        assert_eq!(flipped.count, 1);

        let neutral = SignalAggregator::update_streak(&mut store, Direction::Neutral, now);
        assert_eq!(neutral.count, 0);

        let restarted = SignalAggregator::update_streak(&mut store, Direction::Easy, now);
        assert_eq!(restarted.count, 1);
    }

    #[test]
    fn sustained_after_configured_runs() {
        let aggregator = SignalAggregator::new(&SignalConfig { sustained_runs: 2 });
        let mut store = StateStore::in_memory();
        let rs = reports([Signal::Negative, Signal::Inactive, Signal::Inactive, Signal::Inactive, Signal::Inactive]);

        let first = aggregator.aggregate(&mut store, &rs, Utc::now());
        assert!(!first.sustained);

        let second = aggregator.aggregate(&mut store, &rs, Utc::now());
        assert!(second.sustained);
        assert!(second.conclusion.ends_with("; sustained tight distortion (2+ runs)"));

        let third = aggregator.aggregate(&mut store, &rs, Utc::now());
        assert_eq!(third.streak.count, 3);
        assert_eq!(third.conclusion, second.conclusion);
    }

    #[test]
    fn neutral_streak_is_never_sustained() {
        let aggregator = SignalAggregator::new(&SignalConfig { sustained_runs: 1 });
        assert!(!aggregator.is_sustained(&Streak { direction: Direction::Neutral, count: 0 }));
        assert!(aggregator.is_sustained(&Streak { direction: Direction::Easy, count: 1 }));
    }

    #[test]
    fn message_lists_missing_observed_metrics() {
        let mut vector = MetricVector::default();
        vector.insert(MetricId::Sofr, Observation { value: 5.4, d1: 0.05, d2: 0.05 });
        vector.insert(MetricId::Tga, Observation { value: 750_000.0, d1: -1200.0, d2: 0.0 });

        let aggregate = Aggregate {
            positive_line: "A: None | B: None | C: None | D: None | E: None".into(),
            negative_line: "A: None | B: None | C: None | D: None | E: None".into(),
            conclusion: "A: no data / B: no data / C: no data / D: no data / E: no data".into(),
            streak: Streak { direction: Direction::Neutral, count: 0 },
            sustained: false,
        };
        let msg = render_message(
            &RenderConfig::default(),
            &MessageView { regime: "No Data", momentum: Momentum::NoData, aggregate: &aggregate, vector: &vector },
        );

        assert!(msg.starts_with("[Liquidity Canary]\nRegime: No Data | Momentum: no data\nStreak: neutral\n\n[Trigger]\n"));
        assert!(msg.contains("\n[Momentum]\nno data\n"));
        assert!(msg.contains("\nSOFR=5.4000 Δ=+0.0500 ΔΔ=+0.0500"));
        assert!(msg.contains("\nTGA=750000 Δ=-1200 ΔΔ=+0"));
        assert!(msg.contains("\nEFFR=n/a"));
        assert!(!msg.contains("SOFR_EFFR"));
    }

    #[test]
    fn axis_values_block_is_optional() {
        let aggregate = Aggregate {
            positive_line: String::new(),
            negative_line: String::new(),
            conclusion: "done".into(),
            streak: Streak { direction: Direction::Tight, count: 3 },
            sustained: true,
        };
        let config = RenderConfig { include_axis_values: false, ..Default::default() };
        let msg = render_message(
            &config,
            &MessageView {
                regime: "Neutral",
                momentum: Momentum::Neutral,
                aggregate: &aggregate,
                vector: &MetricVector::default(),
            },
        );
        assert!(msg.contains("Streak: tight (sustained)\n"));
        assert!(!msg.contains("x3"));
        assert!(msg.ends_with("[Conclusion]\ndone"));
    }
}
