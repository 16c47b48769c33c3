//! Handler traits for commands and events.
//!
//! Handlers hold the business logic; the processors own routing and
//! deserialization. A handler failure is reported by the dispatching
//! processor and never retried by it — redelivery is the broker's concern,
//! idempotency the handler's.

use std::sync::Arc;

use crate::command::Command;
use crate::envelope::Envelope;
use crate::event::Event;

/// Handles a single command type.
///
/// Exactly one command handler may be registered per command type.
pub trait CommandHandler<C: Command>: Send + Sync {
    fn handle(&self, command: C) -> anyhow::Result<()>;
}

/// Handles a single event type.
///
/// Any number of handlers may be registered per event type, including
/// none. One handler instance may implement this trait for several event
/// types and be registered once per type.
pub trait EventHandler<E: Event>: Send + Sync {
    fn handle(&self, event: E) -> anyhow::Result<()>;
}

/// Subscribes to every event regardless of concrete type.
///
/// There is no open supertype to deserialize an arbitrary event into, so
/// wildcard subscribers receive the envelope (type tag plus raw body) and
/// decode what they need.
pub trait AnyEventHandler: Send + Sync {
    fn handle_envelope(&self, envelope: &Envelope) -> anyhow::Result<()>;
}

impl<C, H> CommandHandler<C> for Arc<H>
where
    C: Command,
    H: CommandHandler<C> + ?Sized,
{
    fn handle(&self, command: C) -> anyhow::Result<()> {
        (**self).handle(command)
    }
}

impl<E, H> EventHandler<E> for Arc<H>
where
    E: Event,
    H: EventHandler<E> + ?Sized,
{
    fn handle(&self, event: E) -> anyhow::Result<()> {
        (**self).handle(event)
    }
}

impl<H> AnyEventHandler for Arc<H>
where
    H: AnyEventHandler + ?Sized,
{
    fn handle_envelope(&self, envelope: &Envelope) -> anyhow::Result<()> {
        (**self).handle_envelope(envelope)
    }
}
