//! Command processor: routes each inbound command to its single handler.

use serde::de::DeserializeOwned;

use crate::command::Command;
use crate::handler::CommandHandler;
use crate::receiver::MessageReceiver;
use crate::serializer::Serializer;

use super::registry::CommandRegistry;
use super::worker::ProcessorCore;
use super::{Processor, ProcessorConfig, RegistrationError};

/// Routes inbound command envelopes to registered handlers.
///
/// Exactly one handler per command type: a duplicate registration is
/// rejected, and a command arriving with no handler is reported as a
/// configuration error at dispatch time without halting the loop.
pub struct CommandProcessor<R, S> {
    core: ProcessorCore<R, S, CommandRegistry<S>>,
}

impl<R, S> CommandProcessor<R, S>
where
    R: MessageReceiver,
    S: Serializer + Send + Sync + 'static,
{
    pub fn new(receiver: R, serializer: S) -> Self {
        Self::with_config(
            receiver,
            serializer,
            ProcessorConfig::named("command-processor"),
        )
    }

    pub fn with_config(receiver: R, serializer: S, config: ProcessorConfig) -> Self {
        Self {
            core: ProcessorCore::new(receiver, serializer, config, CommandRegistry::new()),
        }
    }

    /// Register the handler for command type `C`.
    ///
    /// Fails on a duplicate registration or once the processor has
    /// started.
    pub fn register<C, H>(&self, handler: H) -> Result<(), RegistrationError>
    where
        C: Command + DeserializeOwned,
        H: CommandHandler<C> + 'static,
    {
        self.core
            .with_table(|registry| registry.register::<C, H>(handler))
    }
}

impl<R, S> Processor for CommandProcessor<R, S>
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
