use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use dealdesk_core::{AggregateId, ExpectedVersion};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, StreamAppend, UncommittedEvent};

/// In-memory append-only event store.
///
/// Intended for tests/dev. Multi-stream transactions hold the single write
/// lock across validation and commit, which is what makes the version
/// re-check at commit time race-free.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<AggregateId, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }

    /// A batch must be non-empty and target exactly one stream.
    fn batch_target(events: &[UncommittedEvent]) -> Result<(AggregateId, &str), EventStoreError> {
        let first = events.first().ok_or_else(|| {
            EventStoreError::InvalidAppend("append batch is empty".to_string())
        })?;

        for (idx, e) in events.iter().enumerate() {
            if e.aggregate_id != first.aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if e.aggregate_type != first.aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        Ok((first.aggregate_id, first.aggregate_type.as_str()))
    }

    fn check_stream(
        streams: &HashMap<AggregateId, Vec<StoredEvent>>,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        expected_version: ExpectedVersion,
    ) -> Result<u64, EventStoreError> {
        let stream = streams.get(&aggregate_id).map(Vec::as_slice).unwrap_or(&[]);
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        // Enforce aggregate type stability across the stream.
        if let Some(existing) = stream.first() {
            if existing.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    existing.aggregate_type, aggregate_type
                )));
            }
        }

        Ok(current)
    }

    fn commit_batch(
        stream: &mut Vec<StoredEvent>,
        events: Vec<UncommittedEvent>,
        committed: &mut Vec<StoredEvent>,
    ) {
        let mut next = Self::current_version(stream) + 1;
        for e in events {
            let stored = StoredEvent {
                event_id: e.event_id,
                aggregate_id: e.aggregate_id,
                aggregate_type: e.aggregate_type,
                sequence_number: next,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            };
            next += 1;
            stream.push(stored.clone());
            committed.push(stored);
        }
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        self.append_transaction(vec![StreamAppend {
            expected_version,
            events,
        }])
    }

    fn append_transaction(
        &self,
        batches: Vec<StreamAppend>,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        // Validate shape before taking the lock.
        let mut touched = HashSet::new();
        for batch in &batches {
            let (aggregate_id, _) = Self::batch_target(&batch.events)?;
            if !touched.insert(aggregate_id) {
                return Err(EventStoreError::InvalidAppend(format!(
                    "transaction touches stream {aggregate_id} twice"
                )));
            }
        }

        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        // First pass: every stream's version check must pass before anything
        // is committed.
        for batch in &batches {
            let (aggregate_id, aggregate_type) = Self::batch_target(&batch.events)?;
            Self::check_stream(&streams, aggregate_id, aggregate_type, batch.expected_version)?;
        }

        // Second pass: commit, assigning sequence numbers (append-only).
        let mut committed = Vec::with_capacity(batches.iter().map(|b| b.events.len()).sum());
        for batch in batches {
            let aggregate_id = batch.events[0].aggregate_id;
            let stream = streams.entry(aggregate_id).or_default();
            Self::commit_batch(stream, batch.events, &mut committed);
        }

        Ok(committed)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        Ok(streams.get(&aggregate_id).cloned().unwrap_or_default())
    }

    fn stream_ids_of_type(
        &self,
        aggregate_type: &str,
    ) -> Result<Vec<AggregateId>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        Ok(streams
            .iter()
            .filter(|(_, stream)| {
                stream
                    .first()
                    .is_some_and(|e| e.aggregate_type == aggregate_type)
            })
            .map(|(id, _)| *id)
            .collect())
    }
}
