use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dealdesk_core::{
    Aggregate, AggregateId, AggregateRoot, ContactId, DomainError, ProjectId, UserId, WorkspaceId,
};
use dealdesk_events::Event;

use crate::line_item::{OrderLineItem, validate_line_items};

/// Sales order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalesOrderId(pub AggregateId);

impl SalesOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SalesOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalesOrderStatus {
    Draft,
    Confirmed,
}

/// Aggregate root: SalesOrder, the seller-side record of an accepted quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesOrder {
    id: SalesOrderId,
    workspace_id: Option<WorkspaceId>,
    project_id: Option<ProjectId>,
    buyer_contact_id: Option<ContactId>,
    status: SalesOrderStatus,
    line_items: Vec<OrderLineItem>,
    created_by: Option<UserId>,
    created_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl SalesOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: SalesOrderId) -> Self {
        Self {
            id,
            workspace_id: None,
            project_id: None,
            buyer_contact_id: None,
            status: SalesOrderStatus::Draft,
            line_items: Vec::new(),
            created_by: None,
            created_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SalesOrderId {
        self.id
    }

    pub fn workspace_id(&self) -> Option<WorkspaceId> {
        self.workspace_id
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    pub fn buyer_contact_id(&self) -> Option<ContactId> {
        self.buyer_contact_id
    }

    pub fn status(&self) -> SalesOrderStatus {
        self.status
    }

    pub fn line_items(&self) -> &[OrderLineItem] {
        &self.line_items
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for SalesOrder {
    type Id = SalesOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateSalesOrder (issued by the acceptance orchestrator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSalesOrder {
    pub order_id: SalesOrderId,
    pub workspace_id: WorkspaceId,
    pub project_id: ProjectId,
    pub buyer_contact_id: ContactId,
    pub line_items: Vec<OrderLineItem>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmSalesOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmSalesOrder {
    pub order_id: SalesOrderId,
    pub confirmed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesOrderCommand {
    CreateSalesOrder(CreateSalesOrder),
    ConfirmSalesOrder(ConfirmSalesOrder),
}

/// Event: SalesOrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrderCreated {
    pub order_id: SalesOrderId,
    pub workspace_id: WorkspaceId,
    pub project_id: ProjectId,
    pub buyer_contact_id: ContactId,
    pub line_items: Vec<OrderLineItem>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SalesOrderConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrderConfirmed {
    pub order_id: SalesOrderId,
    pub confirmed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalesOrderEvent {
    SalesOrderCreated(SalesOrderCreated),
    SalesOrderConfirmed(SalesOrderConfirmed),
}

impl Event for SalesOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SalesOrderEvent::SalesOrderCreated(_) => "orders.sales_order.created",
            SalesOrderEvent::SalesOrderConfirmed(_) => "orders.sales_order.confirmed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SalesOrderEvent::SalesOrderCreated(e) => e.occurred_at,
            SalesOrderEvent::SalesOrderConfirmed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for SalesOrder {
    type Command = SalesOrderCommand;
    type Event = SalesOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SalesOrderEvent::SalesOrderCreated(e) => {
                self.id = e.order_id;
                self.workspace_id = Some(e.workspace_id);
                self.project_id = Some(e.project_id);
                self.buyer_contact_id = Some(e.buyer_contact_id);
                self.status = SalesOrderStatus::Draft;
                self.line_items = e.line_items.clone();
                self.created_by = Some(e.created_by);
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            SalesOrderEvent::SalesOrderConfirmed(_) => {
                self.status = SalesOrderStatus::Confirmed;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SalesOrderCommand::CreateSalesOrder(cmd) => self.handle_create(cmd),
            SalesOrderCommand::ConfirmSalesOrder(cmd) => self.handle_confirm(cmd),
        }
    }
}

impl SalesOrder {
    fn ensure_order_id(&self, order_id: SalesOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::validation("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateSalesOrder) -> Result<Vec<SalesOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("sales order already exists"));
        }
        validate_line_items(&cmd.line_items)?;

        Ok(vec![SalesOrderEvent::SalesOrderCreated(SalesOrderCreated {
            order_id: cmd.order_id,
            workspace_id: cmd.workspace_id,
            project_id: cmd.project_id,
            buyer_contact_id: cmd.buyer_contact_id,
            line_items: cmd.line_items.clone(),
            created_by: cmd.created_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(
        &self,
        cmd: &ConfirmSalesOrder,
    ) -> Result<Vec<SalesOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found("sales order does not exist"));
        }
        self.ensure_order_id(cmd.order_id)?;

        if self.status != SalesOrderStatus::Draft {
            return Err(DomainError::invalid_state(
                "only a draft sales order can be confirmed",
            ));
        }

        Ok(vec![SalesOrderEvent::SalesOrderConfirmed(
            SalesOrderConfirmed {
                order_id: cmd.order_id,
                confirmed_by: cmd.confirmed_by,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_item::OrderLineItemKind;
    use dealdesk_core::{OrderLineItemId, PimCategoryId, QuoteLineItemId, RentalWindow};
    use dealdesk_events::execute;

    fn test_order_id() -> SalesOrderId {
        SalesOrderId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn rental_line(quantity: u32) -> OrderLineItem {
        OrderLineItem {
            id: OrderLineItemId::new(),
            description: "Scissor lift".to_string(),
            quantity,
            price_id: None,
            quote_revision_line_item_id: QuoteLineItemId::new(),
            delivery_method: None,
            delivery_location: None,
            delivery_notes: None,
            kind: OrderLineItemKind::Rental {
                pim_category_id: PimCategoryId::new(),
                rental_window: RentalWindow::new(
                    test_time(),
                    test_time() + chrono::Duration::days(3),
                ),
            },
        }
    }

    fn create_cmd(order_id: SalesOrderId) -> CreateSalesOrder {
        CreateSalesOrder {
            order_id,
            workspace_id: WorkspaceId::new(),
            project_id: ProjectId::new(),
            buyer_contact_id: ContactId::new(),
            line_items: vec![rental_line(1)],
            created_by: UserId::new(),
            occurred_at: test_time(),
        }
    }

    #[test]
    fn create_sales_order_emits_created_event() {
        let order_id = test_order_id();
        let order = SalesOrder::empty(order_id);
        let cmd = create_cmd(order_id);

        let events = order
            .handle(&SalesOrderCommand::CreateSalesOrder(cmd.clone()))
            .unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            SalesOrderEvent::SalesOrderCreated(e) => {
                assert_eq!(e.order_id, order_id);
                assert_eq!(e.buyer_contact_id, cmd.buyer_contact_id);
            }
            _ => panic!("Expected SalesOrderCreated event"),
        }
    }

    #[test]
    fn rental_lines_must_carry_unit_quantity() {
        let order_id = test_order_id();
        let order = SalesOrder::empty(order_id);
        let mut cmd = create_cmd(order_id);
        cmd.line_items = vec![rental_line(3)];

        let err = order
            .handle(&SalesOrderCommand::CreateSalesOrder(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn confirm_transitions_draft_to_confirmed_once() {
        let order_id = test_order_id();
        let mut order = SalesOrder::empty(order_id);
        execute(
            &mut order,
            &SalesOrderCommand::CreateSalesOrder(create_cmd(order_id)),
        )
        .unwrap();

        let confirm = SalesOrderCommand::ConfirmSalesOrder(ConfirmSalesOrder {
            order_id,
            confirmed_by: UserId::new(),
            occurred_at: test_time(),
        });
        execute(&mut order, &confirm).unwrap();
        assert_eq!(order.status(), SalesOrderStatus::Confirmed);

        let err = order.handle(&confirm).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn version_increments_on_apply() {
        let order_id = test_order_id();
        let mut order = SalesOrder::empty(order_id);
        assert_eq!(order.version(), 0);

        execute(
            &mut order,
            &SalesOrderCommand::CreateSalesOrder(create_cmd(order_id)),
        )
        .unwrap();
        assert_eq!(order.version(), 1);
    }
}
