//! Message envelope & metadata.
//!
//! The envelope is the wire unit: an opaque payload plus a string-keyed
//! metadata map. Metadata always carries the message kind and the
//! fully-qualified message type used for routing and deserialization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use confero_core::{CoreError, MessageId, MessageKind, SourceId};

use crate::command::Command;
use crate::event::Event;
use crate::serializer::{SerializationError, Serializer};

/// Standard metadata keys.
pub mod metadata {
    /// Message kind discriminator (`command` | `event`).
    pub const KIND: &str = "kind";
    /// Fully-qualified message type used for routing and deserialization.
    pub const MESSAGE_TYPE: &str = "messageType";
    /// Identity of the aggregate an event speaks about.
    pub const SOURCE_ID: &str = "sourceId";
    /// Correlates a message with the conversation that caused it.
    pub const CORRELATION_ID: &str = "correlationId";
}

/// A standard metadata key was missing or malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("missing metadata key '{0}'")]
    Missing(&'static str),

    #[error(transparent)]
    Kind(#[from] CoreError),
}

/// String-keyed metadata map with typed accessors for the standard keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, String>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Message kind discriminator.
    pub fn kind(&self) -> Result<MessageKind, MetadataError> {
        let raw = self
            .get(metadata::KIND)
            .ok_or(MetadataError::Missing(metadata::KIND))?;
        Ok(raw.parse()?)
    }

    /// Declared message type used for routing and deserialization.
    pub fn message_type(&self) -> Result<&str, MetadataError> {
        self.get(metadata::MESSAGE_TYPE)
            .ok_or(MetadataError::Missing(metadata::MESSAGE_TYPE))
    }

    pub fn source_id(&self) -> Option<SourceId> {
        self.get(metadata::SOURCE_ID).map(SourceId::from)
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.get(metadata::CORRELATION_ID)
    }
}

/// The wire unit: payload bytes plus routing/identity metadata.
///
/// Immutable once created. `id` is assigned by the producer and is the
/// idempotency key for message-log writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    id: MessageId,
    body: Vec<u8>,
    metadata: Metadata,
}

impl Envelope {
    /// Build an envelope from raw parts.
    ///
    /// Prefer [`for_command`](Envelope::for_command) /
    /// [`for_event`](Envelope::for_event), which stamp the standard
    /// metadata keys.
    pub fn from_parts(id: MessageId, body: Vec<u8>, metadata: Metadata) -> Self {
        Self { id, body, metadata }
    }

    /// Envelope for a command, with standard metadata stamped.
    ///
    /// The command's own id becomes the envelope id.
    pub fn for_command<C, S>(command: &C, serializer: &S) -> Result<Self, SerializationError>
    where
        C: Command + Serialize,
        S: Serializer,
    {
        let body = serializer.serialize(command)?;
        let metadata = Metadata::new()
            .with(metadata::KIND, MessageKind::Command.as_str())
            .with(metadata::MESSAGE_TYPE, C::message_type());

        Ok(Self {
            id: command.id(),
            body,
            metadata,
        })
    }

    /// Envelope for an event, with standard metadata stamped.
    ///
    /// Events carry their source id in metadata so the log can be queried
    /// by source. A fresh message id is minted; producers replaying a
    /// message must keep the original id via [`with_id`](Envelope::with_id).
    pub fn for_event<E, S>(event: &E, serializer: &S) -> Result<Self, SerializationError>
    where
        E: Event + Serialize,
        S: Serializer,
    {
        let body = serializer.serialize(event)?;
        let metadata = Metadata::new()
            .with(metadata::KIND, MessageKind::Event.as_str())
            .with(metadata::MESSAGE_TYPE, E::message_type())
            .with(metadata::SOURCE_ID, event.source_id().as_str());

        Ok(Self {
            id: MessageId::new(),
            body,
            metadata,
        })
    }

    /// Replace the producer-assigned identity.
    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = id;
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.metadata.set(metadata::CORRELATION_ID, correlation_id);
        self
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}
