//! Topic/queue adapters.

mod in_memory;

pub use in_memory::{InMemoryTopic, TopicError, TopicFaults};
