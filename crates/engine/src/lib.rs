//! `dealdesk-engine` — orchestration services for the document lifecycle.
//!
//! The engine composes the pure aggregates (rfq, quote, orders, inventory
//! units) with the event-sourcing infrastructure. Every service follows the
//! same shape: load the involved streams, rehydrate, authorize the actor,
//! ask the aggregates to decide, and commit the decided events. Decisions
//! spanning several aggregates (quote acceptance, purchase order submission)
//! commit through one `append_transaction`, so each stream's expected
//! version is re-checked at the commit point and a concurrent writer fails
//! the whole batch with a conflict instead of leaving partial state.
//!
//! Wiring is explicit constructor injection: an event store, an event bus, a
//! pricing resolver, and an identity directory. [`Engine::in_memory`] builds
//! the all-in-memory composition used by tests and dev tooling.

pub mod acceptance;
pub mod error;
pub mod materializer;
pub mod orders;
pub mod purchasing;
pub mod quoting;
pub mod rfq;

pub use acceptance::{AcceptanceOutcome, AcceptanceRequest};
pub use error::{EngineError, EngineResult};
pub use purchasing::SubmissionOutcome;
pub use quoting::{QuoteDraft, RevisionDraft};
pub use rfq::{RfqChanges, RfqDraft};

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use dealdesk_auth::InMemoryIdentityDirectory;
use dealdesk_core::{AggregateId, DomainError, ExpectedVersion};
use dealdesk_events::{EventBus, EventEnvelope, InMemoryEventBus};
use dealdesk_infra::command_dispatcher::CommandDispatcher;
use dealdesk_infra::event_store::{
    EventStore, InMemoryEventStore, StoredEvent, StreamAppend, UncommittedEvent,
};
use dealdesk_inventory::{InventoryId, InventoryUnit};
use dealdesk_orders::{PurchaseOrder, PurchaseOrderId, SalesOrder, SalesOrderId};
use dealdesk_quoting::{InMemoryPriceBook, Quote, QuoteId};
use dealdesk_rfq::{Rfq, RfqId};

/// Aggregate type discriminators for the engine's streams.
pub mod streams {
    pub const RFQ: &str = "rfq";
    pub const QUOTE: &str = "quote";
    pub const SALES_ORDER: &str = "sales_order";
    pub const PURCHASE_ORDER: &str = "purchase_order";
    pub const INVENTORY_UNIT: &str = "inventory_unit";
}

/// Orchestration facade over the document aggregates.
///
/// Generic over its collaborators so tests and future backends plug in
/// without touching service code: `S` persists streams, `B` receives
/// committed events, `P` resolves prices, `D` answers identity questions.
pub struct Engine<S, B, P, D> {
    store: S,
    bus: B,
    dispatcher: CommandDispatcher<S, B>,
    pricing: P,
    directory: D,
}

impl<S, B, P, D> Engine<S, B, P, D>
where
    S: Clone,
    B: Clone,
{
    pub fn new(store: S, bus: B, pricing: P, directory: D) -> Self {
        let dispatcher = CommandDispatcher::new(store.clone(), bus.clone());
        Self {
            store,
            bus,
            dispatcher,
            pricing,
            directory,
        }
    }
}

impl<S, B, P, D> Engine<S, B, P, D> {
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn pricing(&self) -> &P {
        &self.pricing
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }
}

/// All-in-memory composition: in-memory store, bus, price book, directory.
pub type InMemoryEngine = Engine<
    Arc<InMemoryEventStore>,
    Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>,
    Arc<InMemoryPriceBook>,
    Arc<InMemoryIdentityDirectory>,
>;

impl InMemoryEngine {
    pub fn in_memory() -> Self {
        Engine::new(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(InMemoryEventBus::new()),
            Arc::new(InMemoryPriceBook::new()),
            Arc::new(InMemoryIdentityDirectory::new()),
        )
    }
}

impl<S, B, P, D> Engine<S, B, P, D>
where
    S: EventStore,
{
    pub(crate) fn load_rfq(&self, rfq_id: RfqId) -> EngineResult<(Rfq, u64)> {
        Ok(self.dispatcher.load(rfq_id.0, |id| Rfq::empty(RfqId::new(id)))?)
    }

    pub(crate) fn load_quote(&self, quote_id: QuoteId) -> EngineResult<(Quote, u64)> {
        Ok(self
            .dispatcher
            .load(quote_id.0, |id| Quote::empty(QuoteId::new(id)))?)
    }

    pub(crate) fn load_sales_order(
        &self,
        order_id: SalesOrderId,
    ) -> EngineResult<(SalesOrder, u64)> {
        Ok(self
            .dispatcher
            .load(order_id.0, |id| SalesOrder::empty(SalesOrderId::new(id)))?)
    }

    pub(crate) fn load_purchase_order(
        &self,
        order_id: PurchaseOrderId,
    ) -> EngineResult<(PurchaseOrder, u64)> {
        Ok(self.dispatcher.load(order_id.0, |id| {
            PurchaseOrder::empty(PurchaseOrderId::new(id))
        })?)
    }

    pub(crate) fn load_inventory_unit(
        &self,
        inventory_id: InventoryId,
    ) -> EngineResult<(InventoryUnit, u64)> {
        Ok(self.dispatcher.load(inventory_id.0, |id| {
            InventoryUnit::empty(InventoryId::new(id))
        })?)
    }

    /// Read a request for quote; `NotFound` if no such stream exists.
    pub fn rfq(&self, rfq_id: RfqId) -> EngineResult<Rfq> {
        let (rfq, _) = self.load_rfq(rfq_id)?;
        if !rfq.exists() {
            return Err(DomainError::not_found(format!("rfq {rfq_id} does not exist")).into());
        }
        Ok(rfq)
    }

    /// Read a quote; `NotFound` if no such stream exists.
    pub fn quote(&self, quote_id: QuoteId) -> EngineResult<Quote> {
        let (quote, _) = self.load_quote(quote_id)?;
        if !quote.exists() {
            return Err(DomainError::not_found(format!("quote {quote_id} does not exist")).into());
        }
        Ok(quote)
    }

    /// Read a sales order; `NotFound` if no such stream exists.
    pub fn sales_order(&self, order_id: SalesOrderId) -> EngineResult<SalesOrder> {
        let (order, _) = self.load_sales_order(order_id)?;
        if !order.exists() {
            return Err(
                DomainError::not_found(format!("sales order {order_id} does not exist")).into(),
            );
        }
        Ok(order)
    }

    /// Read a purchase order; `NotFound` if no such stream exists.
    pub fn purchase_order(&self, order_id: PurchaseOrderId) -> EngineResult<PurchaseOrder> {
        let (order, _) = self.load_purchase_order(order_id)?;
        if !order.exists() {
            return Err(DomainError::not_found(format!(
                "purchase order {order_id} does not exist"
            ))
            .into());
        }
        Ok(order)
    }

    /// Every inventory unit materialized from the given purchase order.
    pub fn inventory_units_for_purchase_order(
        &self,
        purchase_order_id: PurchaseOrderId,
    ) -> EngineResult<Vec<InventoryUnit>> {
        let mut units = Vec::new();
        for id in self.store.stream_ids_of_type(streams::INVENTORY_UNIT)? {
            let (unit, _) = self.load_inventory_unit(InventoryId::new(id))?;
            if unit.purchase_order_id() == Some(purchase_order_id) {
                units.push(unit);
            }
        }
        Ok(units)
    }

    pub(crate) fn stream_append<E>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        expected_version: ExpectedVersion,
        events: &[E],
    ) -> EngineResult<StreamAppend>
    where
        E: dealdesk_events::Event + Serialize,
    {
        let events = events
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(aggregate_id, aggregate_type, Uuid::now_v7(), ev)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StreamAppend {
            expected_version,
            events,
        })
    }
}

impl<S, B, P, D> Engine<S, B, P, D>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Publish committed events to the bus, in commit order.
    ///
    /// Called after `append_transaction`; a failed publish leaves the
    /// committed events durable (at-least-once delivery).
    pub(crate) fn publish_all(&self, committed: &[StoredEvent]) -> EngineResult<()> {
        for stored in committed {
            self.bus
                .publish(stored.to_envelope())
                .map_err(|e| EngineError::Publish(format!("{e:?}")))?;
        }
        Ok(())
    }
}
