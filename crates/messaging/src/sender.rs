//! Reliable asynchronous delivery to a topic/queue.

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc;

use tracing::error;

use crate::retry::{FaultDetector, RetryExecutor, RetryPolicy};

/// Topic/queue collaborator boundary.
///
/// `Message` is the broker-specific wrapper, built fresh for every
/// delivery attempt. `send` consumes it, so the wrapper is released when
/// the attempt finishes whether or not delivery succeeded.
pub trait Topic: Send + Sync {
    type Message: Send;
    type Error: fmt::Display + Send + 'static;

    fn send(&self, message: Self::Message) -> Result<(), Self::Error>;
}

impl<T> Topic for Arc<T>
where
    T: Topic + ?Sized,
{
    type Message = T::Message;
    type Error = T::Error;

    fn send(&self, message: Self::Message) -> Result<(), Self::Error> {
        (**self).send(message)
    }
}

/// Asynchronous sender of messages to a topic, with bounded retry.
///
/// Each send runs its attempts sequentially on its own worker thread, so
/// multiple sends may be in flight concurrently and ordering between
/// independently sent messages is not guaranteed. The sender holds no
/// message-level state: failure after the retry budget is terminal for
/// that message and reported to the caller, never requeued.
pub struct TopicSender<T, D> {
    topic: Arc<T>,
    retry: RetryExecutor<D>,
}

impl<T, D> TopicSender<T, D>
where
    T: Topic + Send + Sync + 'static,
    D: FaultDetector<T::Error> + Send + Sync + 'static,
{
    pub fn new(topic: Arc<T>, policy: RetryPolicy, detector: D) -> Self {
        Self {
            topic,
            retry: RetryExecutor::new(policy, detector),
        }
    }

    /// Observe retries (attempt number, error) without affecting them.
    ///
    /// Must be called before the first send.
    pub fn with_retry_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(u32, &dyn fmt::Display) + Send + Sync + 'static,
    {
        self.retry = self.retry.with_observer(observer);
        self
    }

    /// Asynchronously send one message.
    ///
    /// `factory` is invoked lazily, once per attempt, so every retry
    /// delivers a fresh broker wrapper. Exactly one of the callbacks
    /// fires once the outcome is known.
    pub fn send_async<F, SF, FF>(&self, factory: F, on_success: SF, on_failure: FF)
    where
        F: Fn() -> T::Message + Send + 'static,
        SF: FnOnce() + Send + 'static,
        FF: FnOnce(T::Error) + Send + 'static,
    {
        let topic = self.topic.clone();
        self.retry.execute_async(
            "topic-send",
            move || topic.send(factory()),
            move |()| on_success(),
            move |err| {
                error!(error = %err, "unrecoverable error while sending a message");
                on_failure(err);
            },
        );
    }

    /// Send each message independently.
    ///
    /// No atomicity across the batch: partial delivery is expected, and
    /// each item carries its own retry budget and outcome.
    pub fn send_async_batch<I, F>(&self, factories: I)
    where
        I: IntoIterator<Item = F>,
        F: Fn() -> T::Message + Send + 'static,
    {
        for factory in factories {
            self.send_async(factory, || {}, |_| {});
        }
    }

    /// Blocking send: waits for the asynchronous outcome and surfaces the
    /// captured error if delivery ultimately failed.
    ///
    /// This wait is the one legitimate blocking point in the sender.
    pub fn send<F>(&self, factory: F) -> Result<(), T::Error>
    where
        F: Fn() -> T::Message + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let done = tx.clone();

        self.send_async(
            factory,
            move || {
                let _ = done.send(Ok(()));
            },
            move |err| {
                let _ = tx.send(Err(err));
            },
        );

        rx.recv()
            .expect("send worker exited without reporting an outcome")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    enum BrokerError {
        #[error("broker unavailable")]
        Unavailable,
        #[error("message rejected")]
        Rejected,
    }

    fn transient_unavailable() -> impl Fn(&BrokerError) -> bool + Send + Sync {
        |error: &BrokerError| matches!(error, BrokerError::Unavailable)
    }

    /// Topic that fails according to a script before accepting deliveries.
    #[derive(Debug, Default)]
    struct ScriptedTopic {
        script: Mutex<VecDeque<BrokerError>>,
        accepted: Mutex<Vec<String>>,
        attempts: AtomicU32,
    }

    impl ScriptedTopic {
        fn failing(failures: impl IntoIterator<Item = BrokerError>) -> Self {
            Self {
                script: Mutex::new(failures.into_iter().collect()),
                ..Default::default()
            }
        }

        fn accepted(&self) -> Vec<String> {
            self.accepted.lock().unwrap().clone()
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl Topic for ScriptedTopic {
        type Message = String;
        type Error = BrokerError;

        fn send(&self, message: String) -> Result<(), BrokerError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.script.lock().unwrap().pop_front() {
                return Err(err);
            }
            self.accepted.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::fixed(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn delivers_on_the_first_attempt() {
        let topic = Arc::new(ScriptedTopic::default());
        let sender = TopicSender::new(topic.clone(), fast_policy(5), transient_unavailable());

        sender.send(|| "registered".to_string()).unwrap();

        assert_eq!(topic.accepted(), vec!["registered".to_string()]);
        assert_eq!(topic.attempts(), 1);
    }

    #[test]
    fn transient_failures_are_retried_until_success() {
        // Fails attempts 1-2, succeeds on attempt 3 out of a budget of 5.
        let topic = Arc::new(ScriptedTopic::failing([
            BrokerError::Unavailable,
            BrokerError::Unavailable,
        ]));
        let retries = Arc::new(AtomicU32::new(0));
        let observed = retries.clone();
        let sender = TopicSender::new(topic.clone(), fast_policy(5), transient_unavailable())
            .with_retry_observer(move |_attempt: u32, _error: &dyn fmt::Display| {
                observed.fetch_add(1, Ordering::SeqCst);
            });

        let successes = Arc::new(AtomicU32::new(0));
        let succeeded = successes.clone();
        let (tx, rx) = mpsc::channel();
        sender.send_async(
            || "seat-reserved".to_string(),
            move || {
                succeeded.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(());
            },
            |err| panic!("send should have succeeded, got {err}"),
        );
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert_eq!(retries.load(Ordering::SeqCst), 2);
        assert_eq!(topic.attempts(), 3);
        assert_eq!(topic.accepted(), vec!["seat-reserved".to_string()]);
    }

    #[test]
    fn factory_builds_a_fresh_wrapper_per_attempt() {
        let topic = Arc::new(ScriptedTopic::failing([
            BrokerError::Unavailable,
            BrokerError::Unavailable,
        ]));
        let sender = TopicSender::new(topic.clone(), fast_policy(5), transient_unavailable());

        let built = Arc::new(AtomicU32::new(0));
        let counting = built.clone();
        sender
            .send(move || format!("build-{}", counting.fetch_add(1, Ordering::SeqCst) + 1))
            .unwrap();

        assert_eq!(built.load(Ordering::SeqCst), 3);
        // Only the wrapper from the successful attempt was delivered.
        assert_eq!(topic.accepted(), vec!["build-3".to_string()]);
    }

    #[test]
    fn exhausting_the_budget_surfaces_the_last_error() {
        let topic = Arc::new(ScriptedTopic::failing([
            BrokerError::Unavailable,
            BrokerError::Unavailable,
            BrokerError::Unavailable,
        ]));
        let sender = TopicSender::new(topic.clone(), fast_policy(3), transient_unavailable());

        let err = sender.send(|| "never-lands".to_string()).unwrap_err();

        assert_eq!(err, BrokerError::Unavailable);
        assert_eq!(topic.attempts(), 3);
        assert!(topic.accepted().is_empty());
    }

    #[test]
    fn non_transient_failure_is_terminal_immediately() {
        let topic = Arc::new(ScriptedTopic::failing([BrokerError::Rejected]));
        let sender = TopicSender::new(topic.clone(), fast_policy(5), transient_unavailable());

        let err = sender.send(|| "bad-message".to_string()).unwrap_err();

        assert_eq!(err, BrokerError::Rejected);
        assert_eq!(topic.attempts(), 1);
    }

    #[test]
    fn batch_items_are_delivered_independently() {
        // One item is rejected outright; the other two still land.
        let topic = Arc::new(ScriptedTopic::failing([BrokerError::Rejected]));
        let sender = TopicSender::new(topic.clone(), fast_policy(2), transient_unavailable());

        sender.send_async_batch(
            ["order-placed", "order-confirmed", "order-expired"]
                .map(|label| move || label.to_string()),
        );

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while (topic.attempts() < 3 || topic.accepted().len() < 2)
            && std::time::Instant::now() < deadline
        {
            std::thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(topic.attempts(), 3);
        assert_eq!(topic.accepted().len(), 2);
    }
}
