//! Sales order services.

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::info;

use dealdesk_auth::{Actor, IdentityDirectory, ensure_workspace_manager};
use dealdesk_core::DomainError;
use dealdesk_events::{EventBus, EventEnvelope};
use dealdesk_infra::event_store::EventStore;
use dealdesk_orders::{ConfirmSalesOrder, SalesOrder, SalesOrderCommand, SalesOrderId};

use crate::error::EngineResult;
use crate::{Engine, streams};

impl<S, B, P, D> Engine<S, B, P, D>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    D: IdentityDirectory,
{
    /// Confirm a sales order (`DRAFT → CONFIRMED`). No side effects beyond
    /// the order itself.
    pub fn confirm_sales_order(
        &self,
        actor: Actor,
        order_id: SalesOrderId,
    ) -> EngineResult<SalesOrder> {
        let (order, _) = self.load_sales_order(order_id)?;
        if !order.exists() {
            return Err(
                DomainError::not_found(format!("sales order {order_id} does not exist")).into(),
            );
        }
        let workspace_id = order
            .workspace_id()
            .ok_or_else(|| DomainError::invalid_state("sales order has no owning workspace"))?;
        ensure_workspace_manager(&self.directory, actor, workspace_id)
            .map_err(DomainError::from)?;

        let cmd = SalesOrderCommand::ConfirmSalesOrder(ConfirmSalesOrder {
            order_id,
            confirmed_by: actor.user_id,
            occurred_at: Utc::now(),
        });

        self.dispatcher
            .dispatch(order_id.0, streams::SALES_ORDER, cmd, |id| {
                SalesOrder::empty(SalesOrderId::new(id))
            })?;
        info!(sales_order_id = %order_id, "sales order confirmed");

        let (order, _) = self.load_sales_order(order_id)?;
        Ok(order)
    }
}
