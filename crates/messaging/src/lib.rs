//! `confero-messaging` — the reliable messaging core.
//!
//! Envelopes and metadata, the command/event abstractions, the serializer
//! boundary, transient-fault retry, the reliable topic sender, the inbound
//! receiver abstraction, and the command/event processors.
//!
//! Delivery is **at-least-once**: the same message may be observed more
//! than once and consumers must be idempotent. Ordering across unrelated
//! messages is not guaranteed.

pub mod command;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod processor;
pub mod receiver;
pub mod retry;
pub mod sender;
pub mod serializer;

pub use command::Command;
pub use envelope::{Envelope, Metadata, MetadataError, metadata};
pub use event::Event;
pub use handler::{AnyEventHandler, CommandHandler, EventHandler};
pub use processor::{
    CommandProcessor, EventProcessor, Processor, ProcessorConfig, RegistrationError,
};
pub use receiver::{MessageReceiver, Subscription};
pub use retry::{Backoff, FaultDetector, RetryExecutor, RetryPolicy};
pub use sender::{Topic, TopicSender};
pub use serializer::{JsonSerializer, SerializationError, Serializer};
