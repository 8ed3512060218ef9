//! Infrastructure layer: event persistence and command dispatch.

pub mod command_dispatcher;
pub mod event_store;

pub use command_dispatcher::{CommandDispatcher, DispatchError, rehydrate};
pub use event_store::{
    EventStore, EventStoreError, InMemoryEventStore, StoredEvent, StreamAppend, UncommittedEvent,
};
