//! In-memory topic for tests/dev.

use std::collections::VecDeque;
use std::sync::Mutex;

use thiserror::Error;

use confero_messaging::{Envelope, FaultDetector, Topic};

/// Delivery failure of the in-memory topic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopicError {
    /// Likely-temporary broker fault.
    #[error("topic unavailable: {0}")]
    Unavailable(String),

    /// The broker rejected the message outright.
    #[error("message rejected: {0}")]
    Rejected(String),
}

/// Fault-detection strategy for the in-memory topic: only `Unavailable`
/// is transient.
#[derive(Debug, Default, Clone, Copy)]
pub struct TopicFaults;

impl FaultDetector<TopicError> for TopicFaults {
    fn is_transient(&self, error: &TopicError) -> bool {
        matches!(error, TopicError::Unavailable(_))
    }
}

/// In-memory topic.
///
/// Records accepted envelopes; failures can be scripted ahead of time to
/// exercise retry behavior.
#[derive(Debug, Default)]
pub struct InMemoryTopic {
    accepted: Mutex<Vec<Envelope>>,
    script: Mutex<VecDeque<TopicError>>,
}

impl InMemoryTopic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a failure for an upcoming delivery attempt.
    pub fn fail_next(&self, error: TopicError) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(error);
        }
    }

    /// Envelopes accepted so far.
    pub fn accepted(&self) -> Vec<Envelope> {
        self.accepted
            .lock()
            .map(|accepted| accepted.clone())
            .unwrap_or_default()
    }
}

impl Topic for InMemoryTopic {
    type Message = Envelope;
    type Error = TopicError;

    fn send(&self, message: Envelope) -> Result<(), TopicError> {
        let scripted = self
            .script
            .lock()
            .map_err(|_| TopicError::Rejected("lock poisoned".to_string()))?
            .pop_front();
        if let Some(error) = scripted {
            return Err(error);
        }

        self.accepted
            .lock()
            .map_err(|_| TopicError::Rejected("lock poisoned".to_string()))?
            .push(message);
        Ok(())
    }
}
