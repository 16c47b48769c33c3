//! Command abstraction.

use confero_core::MessageId;

/// A message instructing a single, authoritative handler to perform an
/// action.
///
/// Commands are routed by [`message_type`](Command::message_type), a stable
/// fully-qualified name (e.g. `"registration.make-seat-reservation"`).
/// Exactly one handler must be registered per command type.
///
/// Serde bounds are applied where commands cross the wire (envelope
/// construction, handler registration), not here.
pub trait Command: Send + Sync + 'static {
    /// Stable routing key for this command type.
    fn message_type() -> &'static str
    where
        Self: Sized;

    /// Producer-assigned message identity (the idempotency key).
    fn id(&self) -> MessageId;
}
