//! Inbound message stream abstraction.
//!
//! A receiver supplies raw envelopes from some transport. Delivery is
//! **at-least-once** with no ordering guarantee; processors must tolerate
//! duplicates. The processors drain a [`Subscription`] on their own worker
//! thread, so the transport's concurrency model never leaks past this
//! boundary.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use crate::envelope::Envelope;

/// A subscription to an inbound message stream.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Supplies a stream of inbound raw messages with a start/stop lifecycle.
///
/// Messages are only delivered while the receiver is started; `subscribe`
/// may be called at any time before or after `start`.
pub trait MessageReceiver: Send + Sync {
    fn start(&self);

    fn stop(&self);

    fn subscribe(&self) -> Subscription<Envelope>;
}

impl<R> MessageReceiver for Arc<R>
where
    R: MessageReceiver + ?Sized,
{
    fn start(&self) {
        (**self).start()
    }

    fn stop(&self) {
        (**self).stop()
    }

    fn subscribe(&self) -> Subscription<Envelope> {
        (**self).subscribe()
    }
}
