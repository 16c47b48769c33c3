//! Durable, append-only, duplicate-tolerant message log.
//!
//! Every inbound and outbound message is written here for audit and
//! replay. Delivery is at-least-once, so the same message id may be
//! observed twice: the store's native conflict signal is treated as
//! success and the log converges to a single record per id.

mod criteria;
mod in_memory;
mod reader;
mod record;
mod store;
mod writer;

pub use criteria::QueryCriteria;
pub use in_memory::InMemoryLogStore;
pub use reader::EventLogReader;
pub use record::LogRecord;
pub use store::{LogStore, LogStoreError, LogStoreFaults};
pub use writer::MessageLogWriter;

use thiserror::Error;

use confero_messaging::SerializationError;

/// Message log operation error.
#[derive(Debug, Error)]
pub enum MessageLogError {
    /// The envelope lacks the metadata the log needs (kind, type).
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// Terminal store failure, surfaced after the retry budget.
    #[error(transparent)]
    Store(#[from] LogStoreError),

    /// A stored payload could not be decoded on the read side.
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}
