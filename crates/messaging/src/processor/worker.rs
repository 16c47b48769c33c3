//! Shared processor lifecycle: the state machine plus the drain worker.

use std::mem;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::envelope::Envelope;
use crate::receiver::{MessageReceiver, Subscription};
use crate::serializer::Serializer;

use super::registry::DispatchTable;
use super::{ProcessorConfig, RegistrationError};

enum State<T> {
    Created(T),
    Started {
        shutdown: mpsc::Sender<()>,
        join: thread::JoinHandle<()>,
    },
    Stopped,
}

/// Lifecycle core shared by the command and event processors.
///
/// The dispatch table is owned by the `Created` state and moved into the
/// worker thread at `start()`, so it is read-only for its entire
/// concurrent life.
pub(super) struct ProcessorCore<R, S, T> {
    receiver: R,
    serializer: Arc<S>,
    config: ProcessorConfig,
    state: Mutex<State<T>>,
}

impl<R, S, T> ProcessorCore<R, S, T>
where
    R: MessageReceiver,
    S: Serializer + Send + Sync + 'static,
    T: DispatchTable<S>,
{
    pub(super) fn new(receiver: R, serializer: S, config: ProcessorConfig, table: T) -> Self {
        Self {
            receiver,
            serializer: Arc::new(serializer),
            config,
            state: Mutex::new(State::Created(table)),
        }
    }

    /// Run `f` against the registry while registrations are still open.
    pub(super) fn with_table<F, O>(&self, f: F) -> Result<O, RegistrationError>
    where
        F: FnOnce(&mut T) -> Result<O, RegistrationError>,
    {
        let mut state = self.state.lock().expect("processor state lock poisoned");
        match &mut *state {
            State::Created(table) => f(table),
            _ => Err(RegistrationError::AlreadyStarted),
        }
    }

    pub(super) fn start(&self) {
        let mut state = self.state.lock().expect("processor state lock poisoned");
        match &*state {
            State::Created(_) => {}
            State::Started { .. } => return,
            State::Stopped => {
                warn!(processor = %self.config.name, "start after stop is a no-op");
                return;
            }
        }

        let State::Created(table) = mem::replace(&mut *state, State::Stopped) else {
            unreachable!("checked above");
        };

        // Subscribe exactly once, then let the transport flow.
        let subscription = self.receiver.subscribe();
        self.receiver.start();

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let serializer = self.serializer.clone();
        let tick = self.config.tick;
        let name = self.config.name.clone();

        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                drain_loop(&name, subscription, shutdown_rx, tick, |envelope| {
                    table.dispatch(&serializer, &envelope)
                })
            })
            .expect("failed to spawn processor worker thread");

        *state = State::Started {
            shutdown: shutdown_tx,
            join,
        };
        info!(processor = %self.config.name, "processor started");
    }

    pub(super) fn stop(&self) {
        let mut state = self.state.lock().expect("processor state lock poisoned");
        if !matches!(&*state, State::Started { .. }) {
            // Stop before start (or a second stop) is a no-op.
            return;
        }
        let State::Started { shutdown, join } = mem::replace(&mut *state, State::Stopped) else {
            unreachable!("checked above");
        };
        drop(state);

        let _ = shutdown.send(());
        self.receiver.stop();
        let _ = join.join();
        info!(processor = %self.config.name, "processor stopped");
    }
}

fn drain_loop<F>(
    name: &str,
    subscription: Subscription<Envelope>,
    shutdown_rx: mpsc::Receiver<()>,
    tick: Duration,
    mut dispatch: F,
) where
    F: FnMut(Envelope),
{
    loop {
        // Shutdown check (non-blocking).
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match subscription.recv_timeout(tick) {
            Ok(envelope) => dispatch(envelope),
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                warn!(processor = name, "subscription disconnected");
                break;
            }
        }
    }
}
