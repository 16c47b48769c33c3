//! In-memory log store for tests/dev.

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::criteria::QueryCriteria;
use super::record::LogRecord;
use super::store::{LogStore, LogStoreError};

/// In-memory log store keyed by record id.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    records: RwLock<BTreeMap<String, LogRecord>>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogStore for InMemoryLogStore {
    fn insert(&self, record: LogRecord) -> Result<(), LogStoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| LogStoreError::Backend("lock poisoned".to_string()))?;

        if records.contains_key(&record.id) {
            return Err(LogStoreError::AlreadyExists { id: record.id });
        }

        records.insert(record.id.clone(), record);
        Ok(())
    }

    fn scan(&self, criteria: &QueryCriteria) -> Result<Vec<LogRecord>, LogStoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| LogStoreError::Backend("lock poisoned".to_string()))?;

        Ok(records
            .values()
            .filter(|record| criteria.matches(record))
            .cloned()
            .collect())
    }
}
