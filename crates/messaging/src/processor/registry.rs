//! Handler registries: message type → ordered invokers.
//!
//! Routing is an explicit map from the metadata type tag to boxed
//! deserialize-and-invoke closures, built once at composition time and
//! read-only after the processor starts.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use confero_core::MessageKind;

use crate::command::Command;
use crate::envelope::Envelope;
use crate::event::Event;
use crate::handler::{AnyEventHandler, CommandHandler, EventHandler};
use crate::serializer::{SerializationError, Serializer};

use super::RegistrationError;

/// Why a single dispatch failed. Already isolated to its message by the
/// time it is reported.
enum DispatchFault {
    /// Payload did not decode into the declared type. Non-transient.
    Deserialize(SerializationError),
    /// The business handler itself failed.
    Handler(anyhow::Error),
}

type Invoker<S> = Box<dyn Fn(&S, &Envelope) -> Result<(), DispatchFault> + Send + Sync>;

/// Routes one inbound envelope to its handlers.
///
/// Never panics and never returns an error: per-message failures are
/// reported and swallowed so the drain loop keeps going.
pub(super) trait DispatchTable<S>: Send + Sync + 'static {
    fn dispatch(&self, serializer: &S, envelope: &Envelope);
}

/// Command routing: exactly one handler per command type.
pub(super) struct CommandRegistry<S> {
    invokers: HashMap<&'static str, Invoker<S>>,
}

impl<S: Serializer> CommandRegistry<S> {
    pub(super) fn new() -> Self {
        Self {
            invokers: HashMap::new(),
        }
    }

    /// Duplicates are rejected here rather than silently misrouting at
    /// dispatch time.
    pub(super) fn register<C, H>(&mut self, handler: H) -> Result<(), RegistrationError>
    where
        C: Command + DeserializeOwned,
        H: CommandHandler<C> + 'static,
    {
        let message_type = C::message_type();
        if self.invokers.contains_key(message_type) {
            return Err(RegistrationError::DuplicateCommandHandler { message_type });
        }

        self.invokers.insert(
            message_type,
            Box::new(move |serializer: &S, envelope: &Envelope| {
                let command: C = serializer
                    .deserialize(envelope.body())
                    .map_err(DispatchFault::Deserialize)?;
                handler.handle(command).map_err(DispatchFault::Handler)
            }),
        );
        Ok(())
    }
}

impl<S> DispatchTable<S> for CommandRegistry<S>
where
    S: Serializer + 'static,
{
    fn dispatch(&self, serializer: &S, envelope: &Envelope) {
        let Some(message_type) = routable_type(envelope, MessageKind::Command) else {
            return;
        };

        let Some(invoker) = self.invokers.get(message_type) else {
            // Every command type must have exactly one handler; none
            // registered is a wiring error, not a routable message.
            error!(
                id = %envelope.id(),
                message_type,
                "configuration error: no handler registered for command type"
            );
            return;
        };

        report(invoker(serializer, envelope), envelope, message_type);
    }
}

/// Event routing: zero or more handlers per concrete type, plus wildcard
/// subscribers consulted for every event.
pub(super) struct EventRegistry<S> {
    invokers: HashMap<&'static str, Vec<Invoker<S>>>,
    wildcard: Vec<Invoker<S>>,
}

impl<S: Serializer> EventRegistry<S> {
    pub(super) fn new() -> Self {
        Self {
            invokers: HashMap::new(),
            wildcard: Vec::new(),
        }
    }

    pub(super) fn register<E, H>(&mut self, handler: H)
    where
        E: Event + DeserializeOwned,
        H: EventHandler<E> + 'static,
    {
        self.invokers.entry(E::message_type()).or_default().push(Box::new(
            move |serializer: &S, envelope: &Envelope| {
                let event: E = serializer
                    .deserialize(envelope.body())
                    .map_err(DispatchFault::Deserialize)?;
                handler.handle(event).map_err(DispatchFault::Handler)
            },
        ));
    }

    pub(super) fn register_any<H>(&mut self, handler: H)
    where
        H: AnyEventHandler + 'static,
    {
        self.wildcard
            .push(Box::new(move |_serializer: &S, envelope: &Envelope| {
                handler.handle_envelope(envelope).map_err(DispatchFault::Handler)
            }));
    }
}

impl<S> DispatchTable<S> for EventRegistry<S>
where
    S: Serializer + 'static,
{
    fn dispatch(&self, serializer: &S, envelope: &Envelope) {
        let Some(message_type) = routable_type(envelope, MessageKind::Event) else {
            return;
        };

        let specific = self
            .invokers
            .get(message_type)
            .map(Vec::as_slice)
            .unwrap_or_default();

        if specific.is_empty() && self.wildcard.is_empty() {
            // Events may legitimately have no subscriber.
            debug!(id = %envelope.id(), message_type, "no subscribers for event type");
            return;
        }

        // Each declared capability fires independently; a failing handler
        // does not stop the rest.
        for invoker in specific.iter().chain(self.wildcard.iter()) {
            report(invoker(serializer, envelope), envelope, message_type);
        }
    }
}

/// Extract the declared type of a message of the expected kind.
///
/// Wrong-kind messages are skipped with a warning (a stream may share a
/// transport with the other kind); malformed metadata is reported and the
/// message is dropped.
fn routable_type(envelope: &Envelope, expected: MessageKind) -> Option<&str> {
    match envelope.metadata().kind() {
        Ok(kind) if kind == expected => {}
        Ok(kind) => {
            warn!(id = %envelope.id(), %kind, "skipping message of unexpected kind");
            return None;
        }
        Err(err) => {
            error!(id = %envelope.id(), error = %err, "malformed message metadata");
            return None;
        }
    }

    match envelope.metadata().message_type() {
        Ok(message_type) => Some(message_type),
        Err(err) => {
            error!(id = %envelope.id(), error = %err, "malformed message metadata");
            None
        }
    }
}

fn report(outcome: Result<(), DispatchFault>, envelope: &Envelope, message_type: &str) {
    match outcome {
        Ok(()) => debug!(id = %envelope.id(), message_type, "message handled"),
        Err(DispatchFault::Deserialize(err)) => error!(
            id = %envelope.id(),
            message_type,
            error = %err,
            "failed to deserialize message payload"
        ),
        Err(DispatchFault::Handler(err)) => error!(
            id = %envelope.id(),
            message_type,
            error = ?err,
            "handler failed"
        ),
    }
}
