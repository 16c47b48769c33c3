//! Event processor: fans each inbound event out to its subscribers.

use serde::de::DeserializeOwned;

use crate::event::Event;
use crate::handler::{AnyEventHandler, EventHandler};
use crate::receiver::MessageReceiver;
use crate::serializer::Serializer;

use super::registry::EventRegistry;
use super::worker::ProcessorCore;
use super::{Processor, ProcessorConfig, RegistrationError};

/// Routes inbound event envelopes to every matching subscriber.
///
/// Zero, one, or many handlers may be registered per event type; wildcard
/// subscribers receive every event regardless of concrete type. An event
/// nobody subscribed to is not an error.
pub struct EventProcessor<R, S> {
    core: ProcessorCore<R, S, EventRegistry<S>>,
}

impl<R, S> EventProcessor<R, S>
where
    R: MessageReceiver,
    S: Serializer + Send + Sync + 'static,
{
    pub fn new(receiver: R, serializer: S) -> Self {
        Self::with_config(
            receiver,
            serializer,
            ProcessorConfig::named("event-processor"),
        )
    }

    pub fn with_config(receiver: R, serializer: S, config: ProcessorConfig) -> Self {
        Self {
            core: ProcessorCore::new(receiver, serializer, config, EventRegistry::new()),
        }
    }

    /// Subscribe `handler` to event type `E`.
    ///
    /// A handler instance that implements [`EventHandler`] for several
    /// event types is registered once per type; each declared capability
    /// fires independently.
    pub fn register<E, H>(&self, handler: H) -> Result<(), RegistrationError>
    where
        E: Event + DeserializeOwned,
        H: EventHandler<E> + 'static,
    {
        self.core.with_table(|registry| {
            registry.register::<E, H>(handler);
            Ok(())
        })
    }

    /// Subscribe `handler` to every event regardless of concrete type.
    pub fn register_any<H>(&self, handler: H) -> Result<(), RegistrationError>
    where
        H: AnyEventHandler + 'static,
    {
        self.core.with_table(|registry| {
            registry.register_any(handler);
            Ok(())
        })
    }
}

impl<R, S> Processor for EventProcessor<R, S>
where
    R: MessageReceiver,
    S: Serializer + Send + Sync + 'static,
{
    fn start(&self) {
        self.core.start();
    }

    fn stop(&self) {
        self.core.stop();
    }
}
