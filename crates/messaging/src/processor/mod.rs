//! Command/event processors: handler registries plus receiver-driven
//! dispatch.
//!
//! Lifecycle is `Created → Started → Stopped`. Handlers are registered
//! while `Created`; `start()` freezes the registry, subscribes to the
//! receiver exactly once and spawns a drain worker; `stop()` halts
//! acceptance and joins the worker. Dispatch failures are isolated per
//! message: one poisoned message never halts the loop.

mod command;
mod event;
mod registry;
mod worker;

pub use command::CommandProcessor;
pub use event::EventProcessor;

use std::time::Duration;

use thiserror::Error;

/// A start/stop message-processing component.
///
/// The composition root collects processors behind this trait and starts
/// and stops them together.
pub trait Processor: Send + Sync {
    /// Begin accepting deliveries. Idempotent: a second call is a no-op.
    fn start(&self);

    /// Halt acceptance. A no-op before `start`; in-flight handler
    /// invocations run to completion.
    fn stop(&self);
}

/// Handler registration failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// A handler is already registered for this command type.
    #[error("a handler is already registered for command type '{message_type}'")]
    DuplicateCommandHandler { message_type: &'static str },

    /// Registrations are frozen once the processor starts.
    #[error("cannot register handlers after the processor has started")]
    AlreadyStarted,
}

/// Drain-worker configuration.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Worker thread name (shows up in logs and stack traces).
    pub name: String,
    /// How often the idle worker checks for shutdown.
    pub tick: Duration,
}

impl ProcessorConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tick: Duration::from_millis(250),
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }
}
