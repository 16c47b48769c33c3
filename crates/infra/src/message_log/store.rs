//! Store collaborator boundary for the message log.

use std::sync::Arc;

use thiserror::Error;

use confero_messaging::FaultDetector;

use super::criteria::QueryCriteria;
use super::record::LogRecord;

/// Storage fault, classified so the writer can retry what is worth
/// retrying and swallow what is already done.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogStoreError {
    /// Native conflict signal: a record with this id is already stored.
    #[error("record '{id}' already exists")]
    AlreadyExists { id: String },

    /// Likely-temporary fault (connection loss, throttling).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Non-transient storage fault.
    #[error("store failure: {0}")]
    Backend(String),
}

/// Row/record store underneath the message log.
///
/// `insert` must report [`LogStoreError::AlreadyExists`] for duplicate
/// ids, distinguishable from other faults. `scan` evaluates the filtered
/// range query the reader translates criteria into; implementations can
/// use [`QueryCriteria::matches`] directly or translate the criteria to
/// their native query language.
pub trait LogStore: Send + Sync {
    fn insert(&self, record: LogRecord) -> Result<(), LogStoreError>;

    fn scan(&self, criteria: &QueryCriteria) -> Result<Vec<LogRecord>, LogStoreError>;
}

impl<S> LogStore for Arc<S>
where
    S: LogStore + ?Sized,
{
    fn insert(&self, record: LogRecord) -> Result<(), LogStoreError> {
        (**self).insert(record)
    }

    fn scan(&self, criteria: &QueryCriteria) -> Result<Vec<LogRecord>, LogStoreError> {
        (**self).scan(criteria)
    }
}

/// Fault-detection strategy for log stores: only `Unavailable` is worth
/// retrying. A conflict is already a success and a backend fault will not
/// heal on its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStoreFaults;

impl FaultDetector<LogStoreError> for LogStoreFaults {
    fn is_transient(&self, error: &LogStoreError) -> bool {
        matches!(error, LogStoreError::Unavailable(_))
    }
}
