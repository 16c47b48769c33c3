//! Typed, read-only event log queries.

use serde::de::DeserializeOwned;

use confero_messaging::Serializer;

use super::MessageLogError;
use super::criteria::QueryCriteria;
use super::store::LogStore;

/// Reads typed events back out of the message log.
///
/// Queries never mutate log state. The log is the source of truth for
/// rebuilding projections, so the reader hands back fully typed events.
pub struct EventLogReader<S, Ser> {
    store: S,
    serializer: Ser,
}

impl<S, Ser> EventLogReader<S, Ser>
where
    S: LogStore,
    Ser: Serializer,
{
    pub fn new(store: S, serializer: Ser) -> Self {
        Self { store, serializer }
    }

    /// Query events matching `criteria`, deserialized to `E`.
    ///
    /// The sequence is lazy, finite and one-shot; querying again
    /// re-executes the filter. Decode failures are yielded per element so
    /// one corrupt record does not hide the rest of the log.
    pub fn query<E>(
        &self,
        criteria: &QueryCriteria,
    ) -> Result<impl Iterator<Item = Result<E, MessageLogError>> + '_, MessageLogError>
    where
        E: DeserializeOwned,
    {
        let records = self.store.scan(criteria)?;

        Ok(records.into_iter().map(|record| {
            self.serializer
                .deserialize(&record.payload)
                .map_err(MessageLogError::from)
        }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use confero_core::{MessageKind, SourceId};
    use confero_messaging::JsonSerializer;
    use serde::{Deserialize, Serialize};

    use super::super::in_memory::InMemoryLogStore;
    use super::super::record::LogRecord;
    use super::super::store::LogStore as _;
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct SeatsReserved {
        source_id: SourceId,
        seats: u32,
    }

    fn stored_event(id: &str, source: &str, seats: u32) -> LogRecord {
        LogRecord {
            id: id.to_string(),
            kind: MessageKind::Event,
            message_type: "registration.seats-reserved".to_string(),
            source_id: Some(source.to_string()),
            stored_at: Utc::now(),
            payload: serde_json::to_vec(&SeatsReserved {
                source_id: SourceId::from(source),
                seats,
            })
            .unwrap(),
        }
    }

    #[test]
    fn returns_typed_events_for_matching_criteria() {
        let store = InMemoryLogStore::new();
        store.insert(stored_event("m-1", "abc", 2)).unwrap();
        store.insert(stored_event("m-2", "xyz", 5)).unwrap();
        let reader = EventLogReader::new(store, JsonSerializer::new());

        let criteria = QueryCriteria::new().with_source(SourceId::from("abc"));
        let events: Vec<SeatsReserved> = reader
            .query(&criteria)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(
            events,
            vec![SeatsReserved {
                source_id: SourceId::from("abc"),
                seats: 2,
            }]
        );
    }

    #[test]
    fn requerying_re_executes_the_filter() {
        let store = InMemoryLogStore::new();
        store.insert(stored_event("m-1", "abc", 2)).unwrap();
        let reader = EventLogReader::new(store, JsonSerializer::new());
        let criteria = QueryCriteria::new().with_source(SourceId::from("abc"));

        assert_eq!(reader.query::<SeatsReserved>(&criteria).unwrap().count(), 1);

        reader
            .store
            .insert(stored_event("m-2", "abc", 4))
            .unwrap();

        assert_eq!(reader.query::<SeatsReserved>(&criteria).unwrap().count(), 2);
    }

    #[test]
    fn corrupt_payload_is_surfaced_per_element() {
        let store = InMemoryLogStore::new();
        let mut corrupt = stored_event("m-1", "abc", 2);
        corrupt.payload = b"{not json".to_vec();
        store.insert(corrupt).unwrap();
        store.insert(stored_event("m-2", "abc", 4)).unwrap();
        let reader = EventLogReader::new(store, JsonSerializer::new());

        let outcomes: Vec<Result<SeatsReserved, _>> = reader
            .query(&QueryCriteria::new().with_source(SourceId::from("abc")))
            .unwrap()
            .collect();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().any(|o| o.is_err()));
        assert!(outcomes.iter().any(|o| o.is_ok()));
    }
}
