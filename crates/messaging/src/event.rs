//! Event abstraction.

use confero_core::SourceId;

/// A message announcing a fact that already happened.
///
/// Events are routed by [`message_type`](Event::message_type) and may have
/// zero, one, or many subscribers, including wildcard subscribers that
/// receive every event regardless of concrete type.
pub trait Event: Send + Sync + 'static {
    /// Stable routing key for this event type.
    fn message_type() -> &'static str
    where
        Self: Sized;

    /// Identity of the aggregate this event speaks about.
    fn source_id(&self) -> SourceId;
}
