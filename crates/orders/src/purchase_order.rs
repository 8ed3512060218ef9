use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dealdesk_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, ProjectId, UserId, WorkspaceId,
};
use dealdesk_events::Event;

use crate::line_item::{OrderLineItem, validate_line_items};

/// Purchase order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseOrderId(pub AggregateId);

impl PurchaseOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PurchaseOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Draft,
    Submitted,
}

/// Aggregate root: PurchaseOrder, the buyer-side record of an accepted quote.
///
/// Submission is single-fire: the draft-to-submitted edge can only be taken
/// once, which is what keeps downstream inventory materialization idempotent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    workspace_id: Option<WorkspaceId>,
    project_id: Option<ProjectId>,
    seller_workspace_id: Option<WorkspaceId>,
    status: PurchaseOrderStatus,
    line_items: Vec<OrderLineItem>,
    created_by: Option<UserId>,
    created_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl PurchaseOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PurchaseOrderId) -> Self {
        Self {
            id,
            workspace_id: None,
            project_id: None,
            seller_workspace_id: None,
            status: PurchaseOrderStatus::Draft,
            line_items: Vec::new(),
            created_by: None,
            created_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn workspace_id(&self) -> Option<WorkspaceId> {
        self.workspace_id
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    pub fn seller_workspace_id(&self) -> Option<WorkspaceId> {
        self.seller_workspace_id
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn line_items(&self) -> &[OrderLineItem] {
        &self.line_items
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePurchaseOrder (issued by the acceptance orchestrator when
/// the quote names a buyer workspace).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchaseOrder {
    pub order_id: PurchaseOrderId,
    pub workspace_id: WorkspaceId,
    pub project_id: Option<ProjectId>,
    pub seller_workspace_id: WorkspaceId,
    pub line_items: Vec<OrderLineItem>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SubmitPurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitPurchaseOrder {
    pub order_id: PurchaseOrderId,
    pub submitted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderCommand {
    CreatePurchaseOrder(CreatePurchaseOrder),
    SubmitPurchaseOrder(SubmitPurchaseOrder),
}

/// Event: PurchaseOrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderCreated {
    pub order_id: PurchaseOrderId,
    pub workspace_id: WorkspaceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    pub seller_workspace_id: WorkspaceId,
    pub line_items: Vec<OrderLineItem>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderSubmitted {
    pub order_id: PurchaseOrderId,
    pub submitted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    PurchaseOrderCreated(PurchaseOrderCreated),
    PurchaseOrderSubmitted(PurchaseOrderSubmitted),
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(_) => "orders.purchase_order.created",
            PurchaseOrderEvent::PurchaseOrderSubmitted(_) => "orders.purchase_order.submitted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderSubmitted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PurchaseOrder {
    type Command = PurchaseOrderCommand;
    type Event = PurchaseOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => {
                self.id = e.order_id;
                self.workspace_id = Some(e.workspace_id);
                self.project_id = e.project_id;
                self.seller_workspace_id = Some(e.seller_workspace_id);
                self.status = PurchaseOrderStatus::Draft;
                self.line_items = e.line_items.clone();
                self.created_by = Some(e.created_by);
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            PurchaseOrderEvent::PurchaseOrderSubmitted(_) => {
                self.status = PurchaseOrderStatus::Submitted;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseOrderCommand::CreatePurchaseOrder(cmd) => self.handle_create(cmd),
            PurchaseOrderCommand::SubmitPurchaseOrder(cmd) => self.handle_submit(cmd),
        }
    }
}

impl PurchaseOrder {
    fn ensure_order_id(&self, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::validation("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(
        &self,
        cmd: &CreatePurchaseOrder,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("purchase order already exists"));
        }
        validate_line_items(&cmd.line_items)?;

        Ok(vec![PurchaseOrderEvent::PurchaseOrderCreated(
            PurchaseOrderCreated {
                order_id: cmd.order_id,
                workspace_id: cmd.workspace_id,
                project_id: cmd.project_id,
                seller_workspace_id: cmd.seller_workspace_id,
                line_items: cmd.line_items.clone(),
                created_by: cmd.created_by,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_submit(
        &self,
        cmd: &SubmitPurchaseOrder,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found("purchase order does not exist"));
        }
        self.ensure_order_id(cmd.order_id)?;

        if self.status != PurchaseOrderStatus::Draft {
            return Err(DomainError::invalid_state(
                "purchase order was already submitted",
            ));
        }

        Ok(vec![PurchaseOrderEvent::PurchaseOrderSubmitted(
            PurchaseOrderSubmitted {
                order_id: cmd.order_id,
                submitted_by: cmd.submitted_by,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_item::OrderLineItemKind;
    use dealdesk_core::{OrderLineItemId, PimCategoryId, QuoteLineItemId};
    use dealdesk_events::execute;

    fn test_order_id() -> PurchaseOrderId {
        PurchaseOrderId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn sale_line(quantity: u32) -> OrderLineItem {
        OrderLineItem {
            id: OrderLineItemId::new(),
            description: "Trench shoring panels".to_string(),
            quantity,
            price_id: None,
            quote_revision_line_item_id: QuoteLineItemId::new(),
            delivery_method: Some("freight".to_string()),
            delivery_location: None,
            delivery_notes: None,
            kind: OrderLineItemKind::Sale {
                pim_category_id: PimCategoryId::new(),
            },
        }
    }

    fn create_cmd(order_id: PurchaseOrderId, line_items: Vec<OrderLineItem>) -> CreatePurchaseOrder {
        CreatePurchaseOrder {
            order_id,
            workspace_id: WorkspaceId::new(),
            project_id: None,
            seller_workspace_id: WorkspaceId::new(),
            line_items,
            created_by: UserId::new(),
            occurred_at: test_time(),
        }
    }

    #[test]
    fn create_purchase_order_emits_created_event() {
        let order_id = test_order_id();
        let order = PurchaseOrder::empty(order_id);

        let events = order
            .handle(&PurchaseOrderCommand::CreatePurchaseOrder(create_cmd(
                order_id,
                vec![sale_line(2)],
            )))
            .unwrap();

        match &events[0] {
            PurchaseOrderEvent::PurchaseOrderCreated(e) => {
                assert_eq!(e.order_id, order_id);
                assert_eq!(e.line_items.len(), 1);
            }
            _ => panic!("Expected PurchaseOrderCreated event"),
        }
    }

    #[test]
    fn purchase_order_may_be_created_without_line_items() {
        let order_id = test_order_id();
        let mut order = PurchaseOrder::empty(order_id);

        execute(
            &mut order,
            &PurchaseOrderCommand::CreatePurchaseOrder(create_cmd(order_id, Vec::new())),
        )
        .unwrap();
        assert!(order.line_items().is_empty());
    }

    #[test]
    fn submit_is_single_fire() {
        let order_id = test_order_id();
        let mut order = PurchaseOrder::empty(order_id);
        execute(
            &mut order,
            &PurchaseOrderCommand::CreatePurchaseOrder(create_cmd(order_id, vec![sale_line(2)])),
        )
        .unwrap();

        let submit = PurchaseOrderCommand::SubmitPurchaseOrder(SubmitPurchaseOrder {
            order_id,
            submitted_by: UserId::new(),
            occurred_at: test_time(),
        });
        execute(&mut order, &submit).unwrap();
        assert_eq!(order.status(), PurchaseOrderStatus::Submitted);

        let err = order.handle(&submit).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn submit_requires_an_existing_order() {
        let order_id = test_order_id();
        let order = PurchaseOrder::empty(order_id);

        let err = order
            .handle(&PurchaseOrderCommand::SubmitPurchaseOrder(
                SubmitPurchaseOrder {
                    order_id,
                    submitted_by: UserId::new(),
                    occurred_at: test_time(),
                },
            ))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn version_increments_on_apply() {
        let order_id = test_order_id();
        let mut order = PurchaseOrder::empty(order_id);
        assert_eq!(order.version(), 0);

        execute(
            &mut order,
            &PurchaseOrderCommand::CreatePurchaseOrder(create_cmd(order_id, vec![sale_line(1)])),
        )
        .unwrap();
        assert_eq!(order.version(), 1);
    }
}
