//! Engine error model.

use thiserror::Error;

use dealdesk_core::DomainError;
use dealdesk_infra::DispatchError;
use dealdesk_infra::event_store::EventStoreError;

/// Result type for engine services.
pub type EngineResult<T> = Result<T, EngineError>;

/// Error surfaced by engine services.
///
/// Domain outcomes pass through verbatim; infrastructure failures keep their
/// own variants so callers can tell a rejected decision from a broken store.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Historical event payloads failed to deserialize during rehydration.
    #[error("event deserialization failed: {0}")]
    Deserialize(String),

    /// The event store refused or failed an append.
    #[error("event store failure: {0}")]
    Store(EventStoreError),

    /// Publication failed after a successful commit (at-least-once; the
    /// committed events are durable, delivery may lag).
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl From<EventStoreError> for EngineError {
    fn from(value: EventStoreError) -> Self {
        match value {
            // Losing an optimistic concurrency race is a business outcome:
            // the caller re-reads and decides whether to retry.
            EventStoreError::Concurrency(msg) => EngineError::Domain(DomainError::conflict(msg)),
            other => EngineError::Store(other),
        }
    }
}

impl From<DispatchError> for EngineError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::Domain(err) => EngineError::Domain(err),
            DispatchError::Deserialize(msg) => EngineError::Deserialize(msg),
            DispatchError::Store(err) => EngineError::from(err),
            DispatchError::Publish(msg) => EngineError::Publish(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_store_errors_become_domain_conflicts() {
        let err = EngineError::from(EventStoreError::Concurrency("stale version".to_string()));
        match err {
            EngineError::Domain(DomainError::Conflict(msg)) => {
                assert!(msg.contains("stale version"));
            }
            other => panic!("Expected Domain(Conflict), got {other:?}"),
        }
    }

    #[test]
    fn domain_dispatch_errors_pass_through() {
        let err = EngineError::from(DispatchError::Domain(DomainError::not_found("no quote")));
        match err {
            EngineError::Domain(DomainError::NotFound(msg)) => assert_eq!(msg, "no quote"),
            other => panic!("Expected Domain(NotFound), got {other:?}"),
        }
    }
}
