//! Idempotent, retrying log writer.

use std::time::Duration;

use tracing::debug;

use confero_messaging::{Envelope, RetryExecutor, RetryPolicy};

use super::MessageLogError;
use super::record::LogRecord;
use super::store::{LogStore, LogStoreError, LogStoreFaults};

/// Writes every message to the log, converging on one record per id.
///
/// Duplicate inserts are the expected outcome of at-least-once delivery,
/// so the store's conflict signal is treated as success. Transient store
/// faults are retried; anything still failing after the budget is
/// surfaced as terminal.
pub struct MessageLogWriter<S> {
    store: S,
    retry: RetryExecutor<LogStoreFaults>,
}

impl<S: LogStore> MessageLogWriter<S> {
    /// Writer with the default store retry policy (10 attempts, 100ms
    /// base, 15s cap).
    pub fn new(store: S) -> Self {
        Self::with_policy(
            store,
            RetryPolicy::exponential(10, Duration::from_millis(100), Duration::from_secs(15)),
        )
    }

    pub fn with_policy(store: S, policy: RetryPolicy) -> Self {
        Self {
            store,
            retry: RetryExecutor::new(policy, LogStoreFaults),
        }
    }

    /// Save one message. A record with the same id already stored is a
    /// successful no-op, never an error.
    pub fn save(&self, envelope: &Envelope) -> Result<(), MessageLogError> {
        let record = LogRecord::from_envelope(envelope)?;

        match self.retry.execute(|| self.store.insert(record.clone())) {
            Ok(()) => Ok(()),
            Err(LogStoreError::AlreadyExists { id }) => {
                debug!(%id, "duplicate log write ignored");
                Ok(())
            }
            Err(err) => Err(MessageLogError::Store(err)),
        }
    }
}
