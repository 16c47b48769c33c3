//! Query criteria for the event log.

use chrono::{DateTime, Utc};

use confero_core::{MessageKind, SourceId};

use super::record::LogRecord;

/// Selects events from the log.
///
/// The log records commands too, but queries are restricted to events:
/// the kind filter is applied unconditionally. All other filters are
/// optional and combine conjunctively.
#[derive(Debug, Clone, Default)]
pub struct QueryCriteria {
    source_id: Option<SourceId>,
    message_types: Vec<String>,
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
}

impl QueryCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to events announced by one source.
    pub fn with_source(mut self, source_id: SourceId) -> Self {
        self.source_id = Some(source_id);
        self
    }

    /// Restrict to the given message type (any of, when called multiple
    /// times).
    pub fn with_message_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_types.push(message_type.into());
        self
    }

    /// Events stored at or after `instant`.
    pub fn with_after(mut self, instant: DateTime<Utc>) -> Self {
        self.after = Some(instant);
        self
    }

    /// Events stored before `instant` (exclusive).
    pub fn with_before(mut self, instant: DateTime<Utc>) -> Self {
        self.before = Some(instant);
        self
    }

    /// Evaluate the criteria against one record.
    pub fn matches(&self, record: &LogRecord) -> bool {
        if record.kind != MessageKind::Event {
            return false;
        }
        if let Some(source_id) = &self.source_id {
            if record.source_id.as_deref() != Some(source_id.as_str()) {
                return false;
            }
        }
        if !self.message_types.is_empty()
            && !self.message_types.iter().any(|t| *t == record.message_type)
        {
            return false;
        }
        if let Some(after) = self.after {
            if record.stored_at < after {
                return false;
            }
        }
        if let Some(before) = self.before {
            if record.stored_at >= before {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: MessageKind, message_type: &str, source_id: Option<&str>) -> LogRecord {
        LogRecord {
            id: "m-1".to_string(),
            kind,
            message_type: message_type.to_string(),
            source_id: source_id.map(str::to_string),
            stored_at: Utc::now(),
            payload: vec![],
        }
    }

    #[test]
    fn commands_never_match() {
        let criteria = QueryCriteria::new();
        let command = record(MessageKind::Command, "registration.expire-order", None);

        assert!(!criteria.matches(&command));
    }

    #[test]
    fn source_and_type_filters_combine() {
        let criteria = QueryCriteria::new()
            .with_source(SourceId::from("abc"))
            .with_message_type("registration.seats-reserved");

        let matching = record(
            MessageKind::Event,
            "registration.seats-reserved",
            Some("abc"),
        );
        let wrong_source = record(
            MessageKind::Event,
            "registration.seats-reserved",
            Some("xyz"),
        );
        let wrong_type = record(MessageKind::Event, "registration.order-placed", Some("abc"));

        assert!(criteria.matches(&matching));
        assert!(!criteria.matches(&wrong_source));
        assert!(!criteria.matches(&wrong_type));
    }

    #[test]
    fn time_range_is_half_open() {
        let now = Utc::now();
        let criteria = QueryCriteria::new()
            .with_after(now - chrono::Duration::minutes(1))
            .with_before(now + chrono::Duration::minutes(1));

        let inside = record(MessageKind::Event, "registration.order-placed", None);
        let mut outside = inside.clone();
        outside.stored_at = now - chrono::Duration::minutes(5);

        assert!(criteria.matches(&inside));
        assert!(!criteria.matches(&outside));
    }
}
