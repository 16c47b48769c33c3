//! Transient-fault retry with bounded attempts and backoff.
//!
//! Collaborators classify their own failures via [`FaultDetector`];
//! the executor retries only what the detector marks transient. Attempts
//! within one operation are strictly sequential, and there is no
//! mid-flight cancellation: an operation runs to success or to budget
//! exhaustion.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::warn;

/// Backoff strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Fixed delay between attempts.
    Fixed,
    /// Exponential: `base * 2^(n-1)` before retry n, capped at `max_delay`.
    Exponential,
}

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first (>= 1).
    pub max_attempts: u32,
    /// Base delay between attempts.
    pub base_delay: Duration,
    /// Delay cap.
    pub max_delay: Duration,
    /// Backoff strategy.
    pub backoff: Backoff,
    /// Jitter factor (0.0-1.0) to spread out retries.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
            backoff: Backoff::Exponential,
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Policy that gives up after the first failure.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Policy with fixed delays.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            backoff: Backoff::Fixed,
            jitter: 0.0,
        }
    }

    /// Policy with exponential backoff.
    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            backoff: Backoff::Exponential,
            jitter: 0.1,
        }
    }

    /// Delay before retry `attempt` (1-indexed: the delay after the
    /// `attempt`-th failure).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_ms = self.base_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;

        let delay_ms = match self.backoff {
            Backoff::Fixed => base_ms.min(max_ms),
            Backoff::Exponential => {
                let exp = 2_f64.powi((attempt - 1) as i32);
                (base_ms * exp).min(max_ms)
            }
        };

        // Deterministic pseudo-jitter keeps retries spread out without a
        // dependency on an RNG.
        let jitter_range = delay_ms * self.jitter;
        let jitter = if jitter_range > 0.0 {
            let pseudo_random = ((attempt as f64 * 17.0) % 100.0) / 100.0;
            jitter_range * (pseudo_random - 0.5) * 2.0
        } else {
            0.0
        };

        Duration::from_millis((delay_ms + jitter).max(0.0) as u64)
    }

    /// Whether another attempt is allowed after `attempt` failures.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Classifies a collaborator's errors as transient (worth retrying) or not.
pub trait FaultDetector<E>: Send + Sync {
    fn is_transient(&self, error: &E) -> bool;
}

impl<E, F> FaultDetector<E> for F
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn is_transient(&self, error: &E) -> bool {
        self(error)
    }
}

/// Observer invoked on every retry with the attempt number and the error.
/// Infallible by signature, so it can never break the retry loop.
type RetryObserver = Box<dyn Fn(u32, &dyn fmt::Display) + Send + Sync>;

struct Inner<D> {
    policy: RetryPolicy,
    detector: D,
    observer: Option<RetryObserver>,
}

/// Wraps fallible operations with a [`RetryPolicy`].
///
/// Cheap to clone; clones share the policy, detector and observer.
pub struct RetryExecutor<D> {
    inner: Arc<Inner<D>>,
}

impl<D> Clone for RetryExecutor<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D> RetryExecutor<D> {
    pub fn new(policy: RetryPolicy, detector: D) -> Self {
        Self {
            inner: Arc::new(Inner {
                policy,
                detector,
                observer: None,
            }),
        }
    }

    /// Attach a retry observer.
    ///
    /// Only callable before the executor is shared.
    pub fn with_observer<F>(self, observer: F) -> Self
    where
        F: Fn(u32, &dyn fmt::Display) + Send + Sync + 'static,
    {
        let inner = Arc::try_unwrap(self.inner).unwrap_or_else(|_| {
            panic!("with_observer must be called before the executor is cloned")
        });
        Self {
            inner: Arc::new(Inner {
                policy: inner.policy,
                detector: inner.detector,
                observer: Some(Box::new(observer)),
            }),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.inner.policy
    }

    /// Run `op` to success or terminal failure, blocking between attempts.
    ///
    /// A non-transient error is surfaced immediately without consuming
    /// retry budget. After `max_attempts` consecutive transient failures
    /// the last error is surfaced.
    pub fn execute<T, E, F>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: fmt::Display,
        D: FaultDetector<E>,
    {
        let mut attempt = 1u32;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(error) if !self.inner.detector.is_transient(&error) => return Err(error),
                Err(error) => {
                    if !self.inner.policy.should_retry(attempt) {
                        return Err(error);
                    }
                    warn!(attempt, error = %error, "transient failure, retrying");
                    if let Some(observer) = &self.inner.observer {
                        observer(attempt, &error);
                    }
                    thread::sleep(self.inner.policy.delay_for_attempt(attempt));
                    attempt += 1;
                }
            }
        }
    }

    /// Non-blocking form: runs [`execute`](RetryExecutor::execute) on a
    /// named worker thread and invokes exactly one of the callbacks with
    /// the outcome.
    pub fn execute_async<T, E, F, SF, FF>(&self, label: &str, op: F, on_success: SF, on_failure: FF)
    where
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
        F: FnMut() -> Result<T, E> + Send + 'static,
        SF: FnOnce(T) + Send + 'static,
        FF: FnOnce(E) + Send + 'static,
        D: FaultDetector<E> + Send + Sync + 'static,
    {
        let executor = self.clone();
        thread::Builder::new()
            .name(label.to_string())
            .spawn(move || match executor.execute(op) {
                Ok(value) => on_success(value),
                Err(error) => on_failure(error),
            })
            .expect("failed to spawn retry worker thread");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::mpsc;

    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    enum TestError {
        #[error("flaky: {0}")]
        Flaky(u32),
        #[error("broken")]
        Broken,
    }

    fn transient_only_flaky() -> impl Fn(&TestError) -> bool + Send + Sync {
        |error: &TestError| matches!(error, TestError::Flaky(_))
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::fixed(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn exponential_backoff_doubles_up_to_the_cap() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            backoff: Backoff::Exponential,
            jitter: 0.0,
        };

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(8), Duration::from_millis(500));
    }

    #[test]
    fn fixed_backoff_is_constant() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(250));

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(250));
    }

    #[test]
    fn always_transient_consumes_exactly_the_budget() {
        let attempts = AtomicU32::new(0);
        let executor = RetryExecutor::new(fast_policy(4), transient_only_flaky());

        let result: Result<(), _> = executor.execute(|| {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            Err(TestError::Flaky(n))
        });

        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        // The last error is the one surfaced.
        assert_eq!(result.unwrap_err(), TestError::Flaky(4));
    }

    #[test]
    fn non_transient_fails_on_the_first_attempt() {
        let attempts = AtomicU32::new(0);
        let executor = RetryExecutor::new(fast_policy(5), transient_only_flaky());

        let result: Result<(), _> = executor.execute(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(TestError::Broken)
        });

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err(), TestError::Broken);
    }

    #[test]
    fn observer_sees_every_retry() {
        let notified = Arc::new(AtomicU32::new(0));
        let seen = notified.clone();
        let executor = RetryExecutor::new(fast_policy(5), transient_only_flaky())
            .with_observer(move |_attempt: u32, _error: &dyn fmt::Display| {
                seen.fetch_add(1, Ordering::SeqCst);
            });

        let attempts = AtomicU32::new(0);
        let result = executor.execute(|| {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 { Err(TestError::Flaky(n)) } else { Ok(n) }
        });

        assert_eq!(result.unwrap(), 3);
        assert_eq!(notified.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn async_form_reports_the_outcome_exactly_once() {
        let executor = RetryExecutor::new(fast_policy(3), transient_only_flaky());
        let (tx, rx) = mpsc::channel();

        let attempts = Arc::new(AtomicU32::new(0));
        let counting = attempts.clone();
        let on_success = {
            let tx = tx.clone();
            move |value: u32| {
                let _ = tx.send(Ok(value));
            }
        };
        executor.execute_async(
            "retry-test",
            move || {
                let n = counting.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 2 { Err(TestError::Flaky(n)) } else { Ok(n) }
            },
            on_success,
            move |error| {
                let _ = tx.send(Err(error));
            },
        );

        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome.unwrap(), 2);
        // No second outcome arrives.
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: without jitter, delays never decrease from one
            /// retry to the next and never exceed the cap.
            #[test]
            fn delays_are_monotonic_up_to_the_cap(
                base_ms in 1u64..1_000,
                cap_ms in 1u64..10_000,
                attempts in 1u32..20,
            ) {
                let policy = RetryPolicy {
                    max_attempts: attempts,
                    base_delay: Duration::from_millis(base_ms),
                    max_delay: Duration::from_millis(cap_ms),
                    backoff: Backoff::Exponential,
                    jitter: 0.0,
                };

                let mut previous = Duration::ZERO;
                for attempt in 1..=attempts {
                    let delay = policy.delay_for_attempt(attempt);
                    prop_assert!(delay >= previous);
                    prop_assert!(delay <= Duration::from_millis(cap_ms));
                    previous = delay;
                }
            }
        }
    }
}
