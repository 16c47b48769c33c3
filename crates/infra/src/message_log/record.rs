//! Stored form of a logged message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use confero_core::MessageKind;
use confero_messaging::Envelope;

use super::MessageLogError;

/// A durably stored copy of one message.
///
/// `id` is unique in the store; inserting an id that is already present
/// raises the store's conflict signal, which the writer swallows. That is
/// what makes the log duplicate-tolerant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: String,
    pub kind: MessageKind,
    pub message_type: String,
    pub source_id: Option<String>,
    pub stored_at: DateTime<Utc>,
    pub payload: Vec<u8>,
}

impl LogRecord {
    /// Capture an envelope as a log record.
    ///
    /// An envelope without a kind or type tag cannot be routed on replay,
    /// so it is rejected as malformed rather than stored.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, MessageLogError> {
        let kind = envelope
            .metadata()
            .kind()
            .map_err(|e| MessageLogError::Malformed(e.to_string()))?;
        let message_type = envelope
            .metadata()
            .message_type()
            .map_err(|e| MessageLogError::Malformed(e.to_string()))?
            .to_string();

        Ok(Self {
            id: envelope.id().to_string(),
            kind,
            message_type,
            source_id: envelope
                .metadata()
                .source_id()
                .map(|s| s.into_string()),
            stored_at: Utc::now(),
            payload: envelope.body().to_vec(),
        })
    }
}
