use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{Record, StateBackend, StateKey, StoreError, StoredValue};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS canary_state (
    base        TEXT NOT NULL,
    field       TEXT NOT NULL,
    num_value   REAL,
    text_value  TEXT,
    updated_at  TEXT NOT NULL,
    PRIMARY KEY (base, field)
);
";

/// Embedded key/value table. Upserts are single statements, so each one is
/// atomic even without the run lock.
pub struct SqliteBackend {
    path: Option<PathBuf>,
    conn: Option<Connection>,
}

impl SqliteBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: Some(path.as_ref().to_path_buf()), conn: None }
    }

    /// In-memory database (for testing)
    pub fn in_memory() -> Self {
        Self { path: None, conn: None }
    }

    fn connection(&mut self) -> Result<&Connection, StoreError> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => open_connection(self.path.as_deref())?,
        };
        let conn: &Connection = self.conn.insert(conn);
        Ok(conn)
    }
}

fn open_connection(path: Option<&Path>) -> Result<Connection, StoreError> {
    let conn = match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
            }
            Connection::open(path)?
        }
        None => Connection::open_in_memory()?,
    };
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

impl StateBackend for SqliteBackend {
    fn name(&self) -> &str { "sqlite" }

    fn load(&mut self, key: &StateKey) -> Result<Option<Record>, StoreError> {
        let conn = self.connection()?;
        let row = conn
            .query_row(
                "SELECT num_value, text_value, updated_at FROM canary_state
                 WHERE base = ?1 AND field = ?2",
                params![key.base, key.field.as_str()],
                |row| {
                    Ok((
                        row.get::<_, Option<f64>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((num, text, updated_at)) = row else {
            return Ok(None);
        };

        let value = match (num, text) {
            (Some(n), _) => StoredValue::Number(n),
            (None, Some(t)) => StoredValue::Text(t),
            (None, None) => {
                return Err(StoreError::Corrupt { details: format!("{} has no value", key) });
            }
        };
        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map_err(|e| StoreError::Corrupt { details: format!("{} timestamp: {}", key, e) })?
            .with_timezone(&Utc);

        Ok(Some(Record { value, updated_at }))
    }

    fn upsert(&mut self, key: &StateKey, record: &Record) -> Result<(), StoreError> {
        let (num, text) = match &record.value {
            StoredValue::Number(n) => (Some(*n), None),
            StoredValue::Text(t) => (None, Some(t.as_str())),
        };
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO canary_state (base, field, num_value, text_value, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(base, field) DO UPDATE SET
                num_value = excluded.num_value,
                text_value = excluded.text_value,
                updated_at = excluded.updated_at",
            params![key.base, key.field.as_str(), num, text, record.updated_at.to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FieldKind;

    #[test]
    fn upsert_replaces_value_and_kind() {
        let mut backend = SqliteBackend::in_memory();
        let key = StateKey::new("distortion_streak", FieldKind::Direction);

        assert_eq!(backend.load(&key).unwrap(), None);

        let now = Utc::now();
        backend
            .upsert(&key, &Record { value: StoredValue::Number(1.0), updated_at: now })
            .unwrap();
        backend
            .upsert(&key, &Record { value: StoredValue::Text("tight".into()), updated_at: now })
            .unwrap();

        let loaded = backend.load(&key).unwrap().unwrap();
        assert_eq!(loaded.value, StoredValue::Text("tight".into()));
        assert_eq!(loaded.updated_at.timestamp(), now.timestamp());
    }

    #[test]
    fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");
        let key = StateKey::new("DGS2", FieldKind::Level);

        let mut backend = SqliteBackend::new(&path);
        backend
            .upsert(&key, &Record { value: StoredValue::Number(4.21), updated_at: Utc::now() })
            .unwrap();
        drop(backend);

        let mut reopened = SqliteBackend::new(&path);
        assert_eq!(reopened.load(&key).unwrap().unwrap().value, StoredValue::Number(4.21));
    }
}
