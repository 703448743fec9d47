//! Durable key/value state that survives between invocations.
//!
//! Every read that feeds a derivative or streak calculation goes through
//! [`StateStore`]. Backend failures never escape the facade: a failed read is
//! "not found", a failed write is logged and dropped.

mod json;
mod lock;
mod memory;
mod sqlite;

pub use json::JsonFileBackend;
pub use lock::RunLock;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::{StorageBackend, StorageConfig};
use crate::types::MetricId;

/// Errors raised inside a backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed state document {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt state record: {details}")]
    Corrupt { details: String },
}

/// Which field of a base identifier a record holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKind {
    /// Last observed level
    Level,
    /// Last first difference
    Delta,
    /// Last net direction
    Direction,
    /// Run counter
    Count,
    /// Content hash
    Digest,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Level => "level",
            FieldKind::Delta => "delta",
            FieldKind::Direction => "direction",
            FieldKind::Count => "count",
            FieldKind::Digest => "digest",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "level" => Some(FieldKind::Level),
            "delta" => Some(FieldKind::Delta),
            "direction" => Some(FieldKind::Direction),
            "count" => Some(FieldKind::Count),
            "digest" => Some(FieldKind::Digest),
            _ => None,
        }
    }
}

/// Structured state key: base identifier plus field kind.
///
/// Keeping the two apart means a metric named `X_d1` can never collide with
/// the delta of metric `X`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateKey {
    pub base: String,
    pub field: FieldKind,
}

impl StateKey {
    pub fn new(base: impl Into<String>, field: FieldKind) -> Self {
        Self { base: base.into(), field }
    }

    pub fn metric(metric: MetricId, field: FieldKind) -> Self {
        Self::new(metric.as_str(), field)
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.base, self.field.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoredValue {
    Number(f64),
    Text(String),
}

/// A persisted value with the time it was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub value: StoredValue,
    pub updated_at: DateTime<Utc>,
}

/// Persistence medium behind [`StateStore`].
///
/// Implementations must tolerate a missing medium on first use (treat as
/// empty) and make each `upsert` of one key atomic.
pub trait StateBackend: Send {
    /// Short name for logging
    fn name(&self) -> &str;

    /// Point lookup
    fn load(&mut self, key: &StateKey) -> Result<Option<Record>, StoreError>;

    /// Point upsert
    fn upsert(&mut self, key: &StateKey, record: &Record) -> Result<(), StoreError>;
}

/// Infallible facade over a [`StateBackend`]
pub struct StateStore {
    backend: Box<dyn StateBackend>,
}

impl StateStore {
    pub fn new(backend: Box<dyn StateBackend>) -> Self {
        Self { backend }
    }

    /// Build the configured backend. Nothing is touched on disk until first access.
    pub fn open(config: &StorageConfig) -> Self {
        let backend: Box<dyn StateBackend> = match config.backend {
            StorageBackend::Json => Box::new(JsonFileBackend::new(&config.path)),
            StorageBackend::Sqlite => Box::new(SqliteBackend::new(&config.path)),
        };
        tracing::debug!(backend = backend.name(), path = %config.path.display(), "Opened state store");
        Self::new(backend)
    }

    /// Store that keeps everything in memory
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Reads fall through to this store's backend, writes stay in memory
    pub fn into_read_only(self) -> Self {
        Self::new(Box::new(MemoryBackend::over(self.backend)))
    }

    pub fn get_num(&mut self, key: &StateKey) -> Option<f64> {
        match self.get(key)?.value {
            StoredValue::Number(v) if v.is_finite() => Some(v),
            other => {
                tracing::warn!(key = %key, value = ?other, "Ignoring non-numeric state record");
                None
            }
        }
    }

    pub fn set_num(&mut self, key: &StateKey, value: f64, at: DateTime<Utc>) {
        self.set(key, StoredValue::Number(value), at);
    }

    pub fn get_text(&mut self, key: &StateKey) -> Option<String> {
        match self.get(key)?.value {
            StoredValue::Text(s) => Some(s),
            other => {
                tracing::warn!(key = %key, value = ?other, "Ignoring non-text state record");
                None
            }
        }
    }

    pub fn set_text(&mut self, key: &StateKey, value: &str, at: DateTime<Utc>) {
        self.set(key, StoredValue::Text(value.to_string()), at);
    }

    fn get(&mut self, key: &StateKey) -> Option<Record> {
        match self.backend.load(key) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    key = %key,
                    error = %e,
                    "State read failed, treating as absent"
                );
                None
            }
        }
    }

    fn set(&mut self, key: &StateKey, value: StoredValue, at: DateTime<Utc>) {
        let record = Record { value, updated_at: at };
        if let Err(e) = self.backend.upsert(key, &record) {
            tracing::warn!(
                backend = self.backend.name(),
                key = %key,
                error = %e,
                "State write failed, dropping"
            );
        }
    }
}
