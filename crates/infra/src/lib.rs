//! `confero-infra` — infrastructure adapters for the messaging core.
//!
//! The message log (writer, reader, criteria) over an abstract store, plus
//! in-memory topic and receiver adapters for tests and development.

pub mod message_log;
pub mod receiver;
pub mod topic;


pub use message_log::{
    EventLogReader, InMemoryLogStore, LogRecord, LogStore, LogStoreError, LogStoreFaults,
    MessageLogError, MessageLogWriter, QueryCriteria,
};
pub use receiver::InMemoryReceiver;
pub use topic::{InMemoryTopic, TopicError, TopicFaults};
