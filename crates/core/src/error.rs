//! Core error model.

use thiserror::Error;

/// Result type used across the core primitives.
pub type CoreResult<T> = Result<T, CoreError>;

/// Core-level error.
///
/// Keep this focused on deterministic failures of the primitive types.
/// Infrastructure concerns (stores, brokers, retry) belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A message-kind discriminator was not recognized.
    #[error("unknown message kind: {0}")]
    UnknownMessageKind(String),
}

impl CoreError {
    pub fn unknown_kind(kind: impl Into<String>) -> Self {
        Self::UnknownMessageKind(kind.into())
    }
}
