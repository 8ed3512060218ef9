//! Purchase order submission and inventory materialization.
//!
//! Submission flips the order `DRAFT → SUBMITTED` and creates its inventory
//! units in the same event store transaction: either the order is submitted
//! and every unit exists, or nothing changed. The submit edge is
//! single-fire, which is the primary duplicate-inventory guard; the
//! [`Engine::on_purchase_order_submitted`] hook adds a per-line existence
//! check for callers that replay submission signals.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use tracing::info;

use dealdesk_auth::{Actor, IdentityDirectory, ensure_workspace_manager};
use dealdesk_core::{Aggregate, AggregateId, DomainError, ExpectedVersion, WorkspaceId};
use dealdesk_events::{EventBus, EventEnvelope};
use dealdesk_infra::event_store::{EventStore, StreamAppend};
use dealdesk_inventory::{
    InventoryCommand, InventoryId, InventoryUnit, MaterializeUnit, PimRef,
};
use dealdesk_orders::{
    OrderLineItem, OrderLineItemKind, PurchaseOrder, PurchaseOrderCommand, PurchaseOrderId,
    PurchaseOrderStatus, SubmitPurchaseOrder,
};

use crate::error::EngineResult;
use crate::{Engine, streams};

/// Result of a purchase order submission.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub purchase_order: PurchaseOrder,
    pub inventory_units: Vec<InventoryUnit>,
}

impl<S, B, P, D> Engine<S, B, P, D>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    D: IdentityDirectory,
{
    /// Submit a draft purchase order and materialize its inventory.
    ///
    /// Rental lines (quantity 1 by construction) yield one `ON_ORDER` unit
    /// each; sale lines yield one unit per quantity; service lines yield
    /// none. A second submit fails `InvalidState` before any unit is built.
    pub fn submit_purchase_order(
        &self,
        actor: Actor,
        purchase_order_id: PurchaseOrderId,
    ) -> EngineResult<SubmissionOutcome> {
        let occurred_at = Utc::now();

        let (order, order_version) = self.load_purchase_order(purchase_order_id)?;
        if !order.exists() {
            return Err(DomainError::not_found(format!(
                "purchase order {purchase_order_id} does not exist"
            ))
            .into());
        }
        let workspace_id = order
            .workspace_id()
            .ok_or_else(|| DomainError::invalid_state("purchase order has no owning workspace"))?;
        ensure_workspace_manager(&self.directory, actor, workspace_id)
            .map_err(DomainError::from)?;

        let submit_cmd = PurchaseOrderCommand::SubmitPurchaseOrder(SubmitPurchaseOrder {
            order_id: purchase_order_id,
            submitted_by: actor.user_id,
            occurred_at,
        });
        let order_events = order.handle(&submit_cmd)?;

        let mut batches = vec![self.stream_append(
            purchase_order_id.0,
            streams::PURCHASE_ORDER,
            ExpectedVersion::Exact(order_version),
            &order_events,
        )?];

        let mut unit_ids = Vec::new();
        for line in order.line_items() {
            let commands =
                materialize_unit_commands(workspace_id, purchase_order_id, line, occurred_at);
            for cmd in commands {
                unit_ids.push(cmd.inventory_id);
                batches.push(self.materialize_batch(cmd)?);
            }
        }

        let committed = self.store.append_transaction(batches)?;
        self.publish_all(&committed)?;
        info!(
            purchase_order_id = %purchase_order_id,
            units = unit_ids.len(),
            "purchase order submitted"
        );

        let (purchase_order, _) = self.load_purchase_order(purchase_order_id)?;
        let mut inventory_units = Vec::with_capacity(unit_ids.len());
        for inventory_id in unit_ids {
            inventory_units.push(self.load_inventory_unit(inventory_id)?.0);
        }

        Ok(SubmissionOutcome {
            purchase_order,
            inventory_units,
        })
    }

    /// Materialize inventory for an already-submitted purchase order.
    ///
    /// No-op while the order is still a draft. Lines that already have
    /// inventory (keyed on `purchase_order_line_item_id`) are skipped, so
    /// replayed submission signals never duplicate units. Returns the units
    /// created by this invocation.
    pub fn on_purchase_order_submitted(
        &self,
        purchase_order_id: PurchaseOrderId,
    ) -> EngineResult<Vec<InventoryUnit>> {
        let (order, _) = self.load_purchase_order(purchase_order_id)?;
        if !order.exists() {
            return Err(DomainError::not_found(format!(
                "purchase order {purchase_order_id} does not exist"
            ))
            .into());
        }
        if order.status() == PurchaseOrderStatus::Draft {
            return Ok(Vec::new());
        }
        let workspace_id = order
            .workspace_id()
            .ok_or_else(|| DomainError::invalid_state("purchase order has no owning workspace"))?;

        let covered: HashSet<_> = self
            .inventory_units_for_purchase_order(purchase_order_id)?
            .iter()
            .filter_map(|unit| unit.purchase_order_line_item_id())
            .collect();

        let occurred_at = Utc::now();
        let mut batches = Vec::new();
        let mut unit_ids = Vec::new();
        for line in order.line_items() {
            if covered.contains(&line.id) {
                continue;
            }
            for cmd in materialize_unit_commands(workspace_id, purchase_order_id, line, occurred_at)
            {
                unit_ids.push(cmd.inventory_id);
                batches.push(self.materialize_batch(cmd)?);
            }
        }

        if batches.is_empty() {
            return Ok(Vec::new());
        }

        let committed = self.store.append_transaction(batches)?;
        self.publish_all(&committed)?;
        info!(
            purchase_order_id = %purchase_order_id,
            units = unit_ids.len(),
            "inventory materialized for submitted purchase order"
        );

        let mut units = Vec::with_capacity(unit_ids.len());
        for inventory_id in unit_ids {
            units.push(self.load_inventory_unit(inventory_id)?.0);
        }
        Ok(units)
    }

    fn materialize_batch(&self, cmd: MaterializeUnit) -> EngineResult<StreamAppend> {
        let inventory_id = cmd.inventory_id;
        let unit = InventoryUnit::empty(inventory_id);
        let events = unit.handle(&InventoryCommand::MaterializeUnit(cmd))?;
        self.stream_append(
            inventory_id.0,
            streams::INVENTORY_UNIT,
            ExpectedVersion::Exact(0),
            &events,
        )
    }
}

/// Plan the unit materialization commands for one purchase order line.
fn materialize_unit_commands(
    workspace_id: WorkspaceId,
    purchase_order_id: PurchaseOrderId,
    line: &OrderLineItem,
    occurred_at: DateTime<Utc>,
) -> Vec<MaterializeUnit> {
    let (count, is_third_party_rental, pim_ref) = match &line.kind {
        OrderLineItemKind::Rental {
            pim_category_id, ..
        } => (
            1u32,
            true,
            Some(PimRef::Category {
                pim_category_id: *pim_category_id,
            }),
        ),
        OrderLineItemKind::Sale { pim_category_id } => (
            line.quantity,
            false,
            Some(PimRef::Category {
                pim_category_id: *pim_category_id,
            }),
        ),
        OrderLineItemKind::Service => (0, false, None),
    };
    let Some(pim_ref) = pim_ref else {
        return Vec::new();
    };

    (0..count)
        .map(|_| MaterializeUnit {
            inventory_id: InventoryId::new(AggregateId::new()),
            workspace_id,
            purchase_order_id,
            purchase_order_line_item_id: line.id,
            is_third_party_rental,
            pim_ref,
            occurred_at,
        })
        .collect()
}
