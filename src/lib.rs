pub mod alerter;
pub mod analyzer;
pub mod canary;
pub mod collector;
pub mod config;
pub mod signal;
pub mod storage;

/// Common types used across modules
pub mod types {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    /// A single metric measurement as returned by a collector
    #[derive(Debug, Clone, Serialize)]
    pub struct MetricSample {
        pub timestamp: DateTime<Utc>,
        pub metric: MetricId,
        pub value: f64,
    }

    /// Metric identifier. The vocabulary is fixed; derived spreads are computed
    /// by the engine from two observed legs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    pub enum MetricId {
        Sofr,
        Effr,
        Iorb,
        OnRrp,
        Tga,
        Reserves,
        Bgcr,
        Dgs2,
        Dgs10,
        Dtwex,
        BtcPrice,
        EthPrice,
        BtcReturn5,
        BtcVolZ,
        BtcAccel,
        SofrEffr,
        IorbEffr,
        BgcrSofr,
        Curve2s10s,
    }

    impl MetricId {
        /// Metrics produced by collectors
        pub const OBSERVED: [MetricId; 15] = [
            MetricId::Sofr,
            MetricId::Effr,
            MetricId::Iorb,
            MetricId::OnRrp,
            MetricId::Tga,
            MetricId::Reserves,
            MetricId::Bgcr,
            MetricId::Dgs2,
            MetricId::Dgs10,
            MetricId::Dtwex,
            MetricId::BtcPrice,
            MetricId::EthPrice,
            MetricId::BtcReturn5,
            MetricId::BtcVolZ,
            MetricId::BtcAccel,
        ];

        /// Spreads derived from two observed legs: (spread, minuend, subtrahend)
        pub const DERIVED: [(MetricId, MetricId, MetricId); 4] = [
            (MetricId::SofrEffr, MetricId::Sofr, MetricId::Effr),
            (MetricId::IorbEffr, MetricId::Iorb, MetricId::Effr),
            (MetricId::BgcrSofr, MetricId::Bgcr, MetricId::Sofr),
            (MetricId::Curve2s10s, MetricId::Dgs10, MetricId::Dgs2),
        ];

        pub fn as_str(&self) -> &'static str {
            match self {
                MetricId::Sofr => "SOFR",
                MetricId::Effr => "EFFR",
                MetricId::Iorb => "IORB",
                MetricId::OnRrp => "ONRRP",
                MetricId::Tga => "TGA",
                MetricId::Reserves => "RESERVES",
                MetricId::Bgcr => "BGCR",
                MetricId::Dgs2 => "DGS2",
                MetricId::Dgs10 => "DGS10",
                MetricId::Dtwex => "DTWEX",
                MetricId::BtcPrice => "BTC_PX",
                MetricId::EthPrice => "ETH_PX",
                MetricId::BtcReturn5 => "BTC_R5",
                MetricId::BtcVolZ => "BTC_VOL_Z",
                MetricId::BtcAccel => "BTC_ACC",
                MetricId::SofrEffr => "SOFR_EFFR",
                MetricId::IorbEffr => "IORB_EFFR",
                MetricId::BgcrSofr => "BGCR_SOFR",
                MetricId::Curve2s10s => "CURVE_2S10S",
            }
        }
    }

    impl std::fmt::Display for MetricId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.as_str())
        }
    }

    /// What a fetcher reported for one key
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum Reading {
        Value(f64),
        Unavailable,
    }

    impl Reading {
        /// Non-finite input is treated as unavailable
        pub fn from_f64(value: f64) -> Self {
            if value.is_finite() {
                Reading::Value(value)
            } else {
                Reading::Unavailable
            }
        }

        pub fn value(&self) -> Option<f64> {
            match self {
                Reading::Value(v) => Some(*v),
                Reading::Unavailable => None,
            }
        }
    }

    /// One invocation's worth of fetched metrics
    #[derive(Debug, Clone, Default)]
    pub struct Snapshot {
        readings: BTreeMap<MetricId, Reading>,
    }

    impl Snapshot {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn from_values(values: &[(MetricId, f64)]) -> Self {
            let mut snapshot = Self::new();
            for (metric, value) in values {
                snapshot.insert(*metric, *value);
            }
            snapshot
        }

        pub fn insert(&mut self, metric: MetricId, value: f64) {
            self.readings.insert(metric, Reading::from_f64(value));
        }

        pub fn mark_unavailable(&mut self, metric: MetricId) {
            self.readings.insert(metric, Reading::Unavailable);
        }

        /// Keys never reported are unavailable as well
        pub fn reading(&self, metric: MetricId) -> Reading {
            self.readings.get(&metric).copied().unwrap_or(Reading::Unavailable)
        }

        pub fn get(&self, metric: MetricId) -> Option<f64> {
            self.reading(metric).value()
        }

        pub fn available(&self) -> impl Iterator<Item = (MetricId, f64)> + '_ {
            self.readings
                .iter()
                .filter_map(|(m, r)| r.value().map(|v| (*m, v)))
        }
    }

    /// Level plus first and second difference for one metric in this run
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Observation {
        pub value: f64,
        pub d1: f64,
        pub d2: f64,
    }

    /// The named metric vector handed to the classifier
    #[derive(Debug, Clone, Default)]
    pub struct MetricVector {
        observations: BTreeMap<MetricId, Observation>,
    }

    impl MetricVector {
        pub fn insert(&mut self, metric: MetricId, observation: Observation) {
            self.observations.insert(metric, observation);
        }

        pub fn get(&self, metric: MetricId) -> Option<Observation> {
            self.observations.get(&metric).copied()
        }

        pub fn level(&self, metric: MetricId) -> Option<f64> {
            self.get(metric).map(|o| o.value)
        }

        pub fn iter(&self) -> impl Iterator<Item = (MetricId, Observation)> + '_ {
            self.observations.iter().map(|(m, o)| (*m, *o))
        }
    }

    /// Independently evaluated signal category, in priority order
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    pub enum AxisId {
        A,
        B,
        C,
        D,
        E,
    }

    impl AxisId {
        pub const ALL: [AxisId; 5] = [AxisId::A, AxisId::B, AxisId::C, AxisId::D, AxisId::E];

        pub fn index(&self) -> usize {
            *self as usize
        }

        pub fn title(&self) -> &'static str {
            match self {
                AxisId::A => "policy corridor",
                AxisId::B => "liquidity flows",
                AxisId::C => "repo spread",
                AxisId::D => "yield curve",
                AxisId::E => "dollar strength",
            }
        }
    }

    impl std::fmt::Display for AxisId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let s = match self {
                AxisId::A => "A",
                AxisId::B => "B",
                AxisId::C => "C",
                AxisId::D => "D",
                AxisId::E => "E",
            };
            write!(f, "{}", s)
        }
    }

    /// Outcome of one axis evaluation.
    ///
    /// `Positive` is liquidity easing, `Negative` is tightening or stress.
    /// `Mixed` registers both at once and cancels out in the streak vote.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum Signal {
        Positive,
        Negative,
        Mixed,
        Inactive,
        NoData,
    }

    impl Signal {
        /// Directional vote; `None` means excluded from the vote
        pub fn vote(&self) -> Option<i32> {
            match self {
                Signal::Positive => Some(1),
                Signal::Negative => Some(-1),
                Signal::Mixed => Some(0),
                Signal::Inactive | Signal::NoData => None,
            }
        }

        pub fn is_active(&self) -> bool {
            self.vote().is_some()
        }
    }

    /// Result of evaluating one axis
    #[derive(Debug, Clone, PartialEq)]
    pub struct AxisReport {
        pub axis: AxisId,
        pub signal: Signal,
        /// Trigger text for the positive line, if any
        pub positive: Option<String>,
        /// Trigger text for the negative line, if any
        pub negative: Option<String>,
        /// Explanation used in the conclusion sentence
        pub conclusion: String,
    }

    impl AxisReport {
        pub fn no_data(axis: AxisId) -> Self {
            Self {
                axis,
                signal: Signal::NoData,
                positive: None,
                negative: None,
                conclusion: format!("{}: no data", axis),
            }
        }
    }

    /// Net direction of a run
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum Direction {
        Tight,
        Easy,
        Neutral,
    }

    impl Direction {
        /// Sign of the summed votes
        pub fn from_net(net: i32) -> Self {
            match net.signum() {
                1 => Direction::Easy,
                -1 => Direction::Tight,
                _ => Direction::Neutral,
            }
        }

        pub fn as_str(&self) -> &'static str {
            match self {
                Direction::Tight => "tight",
                Direction::Easy => "easy",
                Direction::Neutral => "neutral",
            }
        }

        pub fn parse(s: &str) -> Option<Self> {
            match s {
                "tight" => Some(Direction::Tight),
                "easy" => Some(Direction::Easy),
                "neutral" => Some(Direction::Neutral),
                _ => None,
            }
        }
    }

    impl std::fmt::Display for Direction {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.as_str())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn non_finite_readings_are_unavailable() {
            let mut snapshot = Snapshot::new();
            snapshot.insert(MetricId::Sofr, f64::NAN);
            snapshot.insert(MetricId::Effr, f64::INFINITY);
            snapshot.insert(MetricId::Iorb, 5.35);

            assert_eq!(snapshot.reading(MetricId::Sofr), Reading::Unavailable);
            assert_eq!(snapshot.reading(MetricId::Effr), Reading::Unavailable);
            assert_eq!(snapshot.reading(MetricId::Bgcr), Reading::Unavailable);
            assert_eq!(snapshot.get(MetricId::Iorb), Some(5.35));
            assert_eq!(snapshot.available().count(), 1);
        }

        #[test]
        fn net_direction_follows_vote_sign() {
            assert_eq!(Direction::from_net(3), Direction::Easy);
            assert_eq!(Direction::from_net(-1), Direction::Tight);
            assert_eq!(Direction::from_net(0), Direction::Neutral);
            assert_eq!(Direction::parse("tight"), Some(Direction::Tight));
            assert_eq!(Direction::parse("sideways"), None);
        }

        #[test]
        fn inactive_and_missing_axes_do_not_vote() {
            assert_eq!(Signal::Positive.vote(), Some(1));
            assert_eq!(Signal::Negative.vote(), Some(-1));
            assert_eq!(Signal::Mixed.vote(), Some(0));
            assert!(!Signal::Inactive.is_active());
            assert!(!Signal::NoData.is_active());
        }
    }
}
