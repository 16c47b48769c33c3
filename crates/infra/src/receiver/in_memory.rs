//! In-memory receiver for tests/dev.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, mpsc};

use tracing::debug;

use confero_messaging::{Envelope, MessageReceiver, Subscription};

/// In-memory push receiver.
///
/// `deliver` fans out to subscribers only while started; messages pushed
/// while stopped are dropped, which is how `stop()` ceases delivery
/// promptly.
#[derive(Debug, Default)]
pub struct InMemoryReceiver {
    started: AtomicBool,
    subscribers: Mutex<Vec<mpsc::Sender<Envelope>>>,
}

impl InMemoryReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a raw message to all current subscribers.
    pub fn deliver(&self, envelope: Envelope) {
        if !self.started.load(Ordering::SeqCst) {
            debug!(id = %envelope.id(), "receiver stopped, dropping message");
            return;
        }

        if let Ok(mut subscribers) = self.subscribers.lock() {
            // Drop dead subscribers while delivering.
            subscribers.retain(|tx| tx.send(envelope.clone()).is_ok());
        }
    }
}

impl MessageReceiver for InMemoryReceiver {
    fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
    }

    fn subscribe(&self) -> Subscription<Envelope> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        Subscription::new(rx)
    }
}
