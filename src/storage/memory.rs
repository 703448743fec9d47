use std::collections::HashMap;

use super::{Record, StateBackend, StateKey, StoreError};

/// In-process backend. With a `base`, unwritten keys are read from it and
/// nothing is ever written through, which gives dry runs a consistent view
/// without advancing persisted state.
pub struct MemoryBackend {
    records: HashMap<StateKey, Record>,
    base: Option<Box<dyn StateBackend>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self { records: HashMap::new(), base: None }
    }

    pub fn over(base: Box<dyn StateBackend>) -> Self {
        Self { records: HashMap::new(), base: Some(base) }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StateBackend for MemoryBackend {
    fn name(&self) -> &str { "memory" }

    fn load(&mut self, key: &StateKey) -> Result<Option<Record>, StoreError> {
        if let Some(record) = self.records.get(key) {
            return Ok(Some(record.clone()));
        }
        match self.base.as_mut() {
            Some(base) => base.load(key),
            None => Ok(None),
        }
    }

    fn upsert(&mut self, key: &StateKey, record: &Record) -> Result<(), StoreError> {
        self.records.insert(key.clone(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FieldKind, StoredValue};
    use chrono::Utc;

    #[test]
    fn overlay_reads_through_and_shadows_writes() {
        let key = StateKey::new("SOFR", FieldKind::Level);
        let mut base = MemoryBackend::new();
        base.upsert(&key, &Record { value: StoredValue::Number(5.3), updated_at: Utc::now() })
            .unwrap();

        let mut overlay = MemoryBackend::over(Box::new(base));
        assert_eq!(overlay.load(&key).unwrap().unwrap().value, StoredValue::Number(5.3));

        overlay
            .upsert(&key, &Record { value: StoredValue::Number(5.4), updated_at: Utc::now() })
            .unwrap();
        assert_eq!(overlay.load(&key).unwrap().unwrap().value, StoredValue::Number(5.4));

        let base = overlay.base.as_mut().unwrap();
        assert_eq!(base.load(&key).unwrap().unwrap().value, StoredValue::Number(5.3));
    }
}
