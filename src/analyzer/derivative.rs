use chrono::{DateTime, Utc};

use crate::storage::{FieldKind, StateKey, StateStore};
use crate::types::{MetricId, MetricVector, Observation, Snapshot};

/// Reconstructs slope (Δ) and acceleration (ΔΔ) from persisted state.
///
/// The previous level and previous Δ are the only memory; both are rewritten
/// on every observation, so gaps between observations are fine.
pub struct DerivativeTracker<'a> {
    store: &'a mut StateStore,
    now: DateTime<Utc>,
}

impl<'a> DerivativeTracker<'a> {
    pub fn new(store: &'a mut StateStore, now: DateTime<Utc>) -> Self {
        Self { store, now }
    }

    /// Caller guarantees `value` is finite.
    pub fn slope_and_accel(&mut self, key: &str, value: f64) -> (f64, f64) {
        let level_key = StateKey::new(key, FieldKind::Level);
        let delta_key = StateKey::new(key, FieldKind::Delta);

        let prev = self.store.get_num(&level_key);
        let prev_d1 = self.store.get_num(&delta_key);

        let (d1, d2) = match prev {
            None => (0.0, 0.0),
            Some(prev) => {
                let d1 = value - prev;
                let d2 = prev_d1.map_or(0.0, |prev_d1| d1 - prev_d1);
                (d1, d2)
            }
        };

        self.store.set_num(&level_key, value, self.now);
        self.store.set_num(&delta_key, d1, self.now);
        (d1, d2)
    }

    pub fn observe(&mut self, metric: MetricId, value: f64) -> Observation {
        let (d1, d2) = self.slope_and_accel(metric.as_str(), value);
        Observation { value, d1, d2 }
    }

    /// Tracks every available metric in the snapshot plus each derived spread
    /// whose two legs are both available. Unavailable metrics are not touched.
    pub fn track(&mut self, snapshot: &Snapshot) -> MetricVector {
        let mut vector = MetricVector::default();

        for (metric, value) in snapshot.available() {
            vector.insert(metric, self.observe(metric, value));
        }

        for (spread, minuend, subtrahend) in MetricId::DERIVED {
            if let (Some(a), Some(b)) = (snapshot.get(minuend), snapshot.get(subtrahend)) {
                vector.insert(spread, self.observe(spread, spread_of(a, b)));
            }
        }

        tracing::debug!(tracked = vector.iter().count(), "Updated derivative state");
        vector
    }
}

/// Difference of two quoted rates with float noise below 1e-6 removed, so
/// 5.35 - 5.33 compares as exactly 0.02.
pub fn spread_of(a: f64, b: f64) -> f64 {
    ((a - b) * 1e6).round() / 1e6
}
