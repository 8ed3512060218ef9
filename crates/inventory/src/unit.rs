use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dealdesk_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, OrderLineItemId, PimCategoryId,
    PimProductId, UserId, WorkspaceId,
};
use dealdesk_events::Event;
use dealdesk_orders::PurchaseOrderId;

/// Inventory unit identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryId(pub AggregateId);

impl InventoryId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InventoryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    OnOrder,
    Available,
}

/// Catalog reference: a concrete product or just a category.
///
/// Units materialized from purchase orders only know the ordered category; a
/// concrete product is assigned later, outside this workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ref", rename_all = "lowercase")]
pub enum PimRef {
    Product { pim_product_id: PimProductId },
    Category { pim_category_id: PimCategoryId },
}

/// Aggregate root: InventoryUnit.
///
/// Exactly one unit exists per unit of quantity on a submitted purchase
/// order line; `purchase_order_line_item_id` is the traceability key the
/// materializer dedupes on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryUnit {
    id: InventoryId,
    workspace_id: Option<WorkspaceId>,
    purchase_order_id: Option<PurchaseOrderId>,
    purchase_order_line_item_id: Option<OrderLineItemId>,
    status: InventoryStatus,
    is_third_party_rental: bool,
    pim_ref: Option<PimRef>,
    created_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl InventoryUnit {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InventoryId) -> Self {
        Self {
            id,
            workspace_id: None,
            purchase_order_id: None,
            purchase_order_line_item_id: None,
            status: InventoryStatus::OnOrder,
            is_third_party_rental: false,
            pim_ref: None,
            created_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InventoryId {
        self.id
    }

    pub fn workspace_id(&self) -> Option<WorkspaceId> {
        self.workspace_id
    }

    pub fn purchase_order_id(&self) -> Option<PurchaseOrderId> {
        self.purchase_order_id
    }

    pub fn purchase_order_line_item_id(&self) -> Option<OrderLineItemId> {
        self.purchase_order_line_item_id
    }

    pub fn status(&self) -> InventoryStatus {
        self.status
    }

    pub fn is_third_party_rental(&self) -> bool {
        self.is_third_party_rental
    }

    pub fn pim_ref(&self) -> Option<PimRef> {
        self.pim_ref
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for InventoryUnit {
    type Id = InventoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: MaterializeUnit (issued by the inventory materializer on
/// purchase order submission).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializeUnit {
    pub inventory_id: InventoryId,
    pub workspace_id: WorkspaceId,
    pub purchase_order_id: PurchaseOrderId,
    pub purchase_order_line_item_id: OrderLineItemId,
    pub is_third_party_rental: bool,
    pub pim_ref: PimRef,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkUnitAvailable (goods received).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkUnitAvailable {
    pub inventory_id: InventoryId,
    pub marked_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryCommand {
    MaterializeUnit(MaterializeUnit),
    MarkUnitAvailable(MarkUnitAvailable),
}

/// Event: UnitMaterialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMaterialized {
    pub inventory_id: InventoryId,
    pub workspace_id: WorkspaceId,
    pub purchase_order_id: PurchaseOrderId,
    pub purchase_order_line_item_id: OrderLineItemId,
    pub is_third_party_rental: bool,
    pub pim_ref: PimRef,
    pub occurred_at: DateTime<Utc>,
}

/// Event: UnitMarkedAvailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMarkedAvailable {
    pub inventory_id: InventoryId,
    pub marked_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    UnitMaterialized(UnitMaterialized),
    UnitMarkedAvailable(UnitMarkedAvailable),
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::UnitMaterialized(_) => "inventory.unit.materialized",
            InventoryEvent::UnitMarkedAvailable(_) => "inventory.unit.marked_available",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::UnitMaterialized(e) => e.occurred_at,
            InventoryEvent::UnitMarkedAvailable(e) => e.occurred_at,
        }
    }
}

impl Aggregate for InventoryUnit {
    type Command = InventoryCommand;
    type Event = InventoryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InventoryEvent::UnitMaterialized(e) => {
                self.id = e.inventory_id;
                self.workspace_id = Some(e.workspace_id);
                self.purchase_order_id = Some(e.purchase_order_id);
                self.purchase_order_line_item_id = Some(e.purchase_order_line_item_id);
                self.status = InventoryStatus::OnOrder;
                self.is_third_party_rental = e.is_third_party_rental;
                self.pim_ref = Some(e.pim_ref);
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            InventoryEvent::UnitMarkedAvailable(_) => {
                self.status = InventoryStatus::Available;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InventoryCommand::MaterializeUnit(cmd) => self.handle_materialize(cmd),
            InventoryCommand::MarkUnitAvailable(cmd) => self.handle_mark_available(cmd),
        }
    }
}

impl InventoryUnit {
    fn handle_materialize(
        &self,
        cmd: &MaterializeUnit,
    ) -> Result<Vec<InventoryEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("inventory unit already exists"));
        }

        Ok(vec![InventoryEvent::UnitMaterialized(UnitMaterialized {
            inventory_id: cmd.inventory_id,
            workspace_id: cmd.workspace_id,
            purchase_order_id: cmd.purchase_order_id,
            purchase_order_line_item_id: cmd.purchase_order_line_item_id,
            is_third_party_rental: cmd.is_third_party_rental,
            pim_ref: cmd.pim_ref,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_available(
        &self,
        cmd: &MarkUnitAvailable,
    ) -> Result<Vec<InventoryEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found("inventory unit does not exist"));
        }
        if self.id != cmd.inventory_id {
            return Err(DomainError::validation("inventory_id mismatch"));
        }
        if self.status != InventoryStatus::OnOrder {
            return Err(DomainError::invalid_state(
                "only an on-order unit can be marked available",
            ));
        }

        Ok(vec![InventoryEvent::UnitMarkedAvailable(
            UnitMarkedAvailable {
                inventory_id: cmd.inventory_id,
                marked_by: cmd.marked_by,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealdesk_events::execute;

    fn test_inventory_id() -> InventoryId {
        InventoryId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn materialize_cmd(inventory_id: InventoryId) -> MaterializeUnit {
        MaterializeUnit {
            inventory_id,
            workspace_id: WorkspaceId::new(),
            purchase_order_id: PurchaseOrderId::new(AggregateId::new()),
            purchase_order_line_item_id: OrderLineItemId::new(),
            is_third_party_rental: true,
            pim_ref: PimRef::Category {
                pim_category_id: PimCategoryId::new(),
            },
            occurred_at: test_time(),
        }
    }

    #[test]
    fn materialize_creates_an_on_order_unit() {
        let inventory_id = test_inventory_id();
        let mut unit = InventoryUnit::empty(inventory_id);
        let cmd = materialize_cmd(inventory_id);

        let events = execute(&mut unit, &InventoryCommand::MaterializeUnit(cmd.clone())).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            InventoryEvent::UnitMaterialized(e) => {
                assert_eq!(e.purchase_order_id, cmd.purchase_order_id);
            }
            _ => panic!("Expected UnitMaterialized event"),
        }

        assert_eq!(unit.status(), InventoryStatus::OnOrder);
        assert!(unit.is_third_party_rental());
        assert_eq!(
            unit.purchase_order_line_item_id(),
            Some(cmd.purchase_order_line_item_id)
        );
    }

    #[test]
    fn materialize_twice_conflicts() {
        let inventory_id = test_inventory_id();
        let mut unit = InventoryUnit::empty(inventory_id);
        execute(
            &mut unit,
            &InventoryCommand::MaterializeUnit(materialize_cmd(inventory_id)),
        )
        .unwrap();

        let err = unit
            .handle(&InventoryCommand::MaterializeUnit(materialize_cmd(
                inventory_id,
            )))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn mark_available_transitions_on_order_only() {
        let inventory_id = test_inventory_id();
        let mut unit = InventoryUnit::empty(inventory_id);
        execute(
            &mut unit,
            &InventoryCommand::MaterializeUnit(materialize_cmd(inventory_id)),
        )
        .unwrap();

        let mark = InventoryCommand::MarkUnitAvailable(MarkUnitAvailable {
            inventory_id,
            marked_by: UserId::new(),
            occurred_at: test_time(),
        });
        execute(&mut unit, &mark).unwrap();
        assert_eq!(unit.status(), InventoryStatus::Available);

        let err = unit.handle(&mark).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn version_increments_on_apply() {
        let inventory_id = test_inventory_id();
        let mut unit = InventoryUnit::empty(inventory_id);
        assert_eq!(unit.version(), 0);

        execute(
            &mut unit,
            &InventoryCommand::MaterializeUnit(materialize_cmd(inventory_id)),
        )
        .unwrap();
        assert_eq!(unit.version(), 1);
    }
}
