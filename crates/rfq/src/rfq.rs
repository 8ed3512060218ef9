use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dealdesk_core::{
    Aggregate, AggregateId, AggregateRoot, ContactId, DomainError, Patch, PimCategoryId,
    RentalWindow, UserId, WorkspaceId,
};
use dealdesk_events::Event;

/// Request-for-Quote identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RfqId(pub AggregateId);

impl RfqId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RfqId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// RFQ status lifecycle.
///
/// Direct updates are permitted only while the RFQ is `Draft` or `Sent`;
/// `Accepted` is normally reached through quote acceptance, though a buyer
/// may also close out a sent RFQ into any terminal state explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RfqStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
    Cancelled,
    Expired,
}

impl RfqStatus {
    /// Draft and Sent are the only states open to direct updates.
    pub fn is_open(self) -> bool {
        matches!(self, RfqStatus::Draft | RfqStatus::Sent)
    }
}

fn can_transition(from: RfqStatus, to: RfqStatus) -> bool {
    matches!(
        (from, to),
        (RfqStatus::Draft, RfqStatus::Sent)
            | (RfqStatus::Sent, RfqStatus::Accepted)
            | (RfqStatus::Sent, RfqStatus::Rejected)
            | (RfqStatus::Sent, RfqStatus::Cancelled)
            | (RfqStatus::Sent, RfqStatus::Expired)
    )
}

/// What the buyer is asking for, before any seller pricing exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementLineItem {
    pub description: String,
    pub quantity: u32,
    #[serde(flatten)]
    pub kind: RequirementKind,
}

/// Kind-specific requirement data (closed sum type, `kind` discriminant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RequirementKind {
    Rental {
        pim_category_id: PimCategoryId,
        rental_window: RentalWindow,
    },
    Sale {
        pim_category_id: PimCategoryId,
    },
    Service,
}

/// Aggregate root: Rfq.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rfq {
    id: RfqId,
    buyers_workspace_id: Option<WorkspaceId>,
    status: RfqStatus,
    invited_seller_contact_ids: HashSet<ContactId>,
    line_items: Vec<RequirementLineItem>,
    response_deadline: Option<DateTime<Utc>>,
    created_by: Option<UserId>,
    updated_by: Option<UserId>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Rfq {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: RfqId) -> Self {
        Self {
            id,
            buyers_workspace_id: None,
            status: RfqStatus::Draft,
            invited_seller_contact_ids: HashSet::new(),
            line_items: Vec::new(),
            response_deadline: None,
            created_by: None,
            updated_by: None,
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> RfqId {
        self.id
    }

    pub fn buyers_workspace_id(&self) -> Option<WorkspaceId> {
        self.buyers_workspace_id
    }

    pub fn status(&self) -> RfqStatus {
        self.status
    }

    pub fn invited_seller_contact_ids(&self) -> &HashSet<ContactId> {
        &self.invited_seller_contact_ids
    }

    pub fn line_items(&self) -> &[RequirementLineItem] {
        &self.line_items
    }

    pub fn response_deadline(&self) -> Option<DateTime<Utc>> {
        self.response_deadline
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Rfq {
    type Id = RfqId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateRfq.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRfq {
    pub rfq_id: RfqId,
    pub buyers_workspace_id: WorkspaceId,
    pub invited_seller_contact_ids: HashSet<ContactId>,
    pub line_items: Vec<RequirementLineItem>,
    pub response_deadline: Option<DateTime<Utc>>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateRfq.
///
/// `invited_seller_contact_ids` and `line_items` are replaced wholesale when
/// present (no partial patch semantics). `response_deadline` is patchable:
/// an omitted field keeps the prior deadline, an explicit null clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRfq {
    pub rfq_id: RfqId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RfqStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invited_seller_contact_ids: Option<HashSet<ContactId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<RequirementLineItem>>,
    #[serde(default, skip_serializing_if = "Patch::is_omitted")]
    pub response_deadline: Patch<DateTime<Utc>>,
    pub updated_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkRfqAccepted (orchestrator-driven, on quote acceptance).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkRfqAccepted {
    pub rfq_id: RfqId,
    pub accepted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RfqCommand {
    CreateRfq(CreateRfq),
    UpdateRfq(UpdateRfq),
    MarkRfqAccepted(MarkRfqAccepted),
}

/// Event: RfqCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqCreated {
    pub rfq_id: RfqId,
    pub buyers_workspace_id: WorkspaceId,
    pub invited_seller_contact_ids: HashSet<ContactId>,
    pub line_items: Vec<RequirementLineItem>,
    pub response_deadline: Option<DateTime<Utc>>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RfqUpdated.
///
/// Absent fields were untouched by the update; the deadline patch survives
/// serialization losslessly because omitted keys are skipped entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqUpdated {
    pub rfq_id: RfqId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RfqStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invited_seller_contact_ids: Option<HashSet<ContactId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<RequirementLineItem>>,
    #[serde(default, skip_serializing_if = "Patch::is_omitted")]
    pub response_deadline: Patch<DateTime<Utc>>,
    pub updated_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RfqAccepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqAccepted {
    pub rfq_id: RfqId,
    pub accepted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RfqEvent {
    RfqCreated(RfqCreated),
    RfqUpdated(RfqUpdated),
    RfqAccepted(RfqAccepted),
}

impl Event for RfqEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RfqEvent::RfqCreated(_) => "rfq.created",
            RfqEvent::RfqUpdated(_) => "rfq.updated",
            RfqEvent::RfqAccepted(_) => "rfq.accepted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RfqEvent::RfqCreated(e) => e.occurred_at,
            RfqEvent::RfqUpdated(e) => e.occurred_at,
            RfqEvent::RfqAccepted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Rfq {
    type Command = RfqCommand;
    type Event = RfqEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RfqEvent::RfqCreated(e) => {
                self.id = e.rfq_id;
                self.buyers_workspace_id = Some(e.buyers_workspace_id);
                self.status = RfqStatus::Draft;
                self.invited_seller_contact_ids = e.invited_seller_contact_ids.clone();
                self.line_items = e.line_items.clone();
                self.response_deadline = e.response_deadline;
                self.created_by = Some(e.created_by);
                self.updated_by = Some(e.created_by);
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            RfqEvent::RfqUpdated(e) => {
                if let Some(status) = e.status {
                    self.status = status;
                }
                if let Some(invited) = &e.invited_seller_contact_ids {
                    self.invited_seller_contact_ids = invited.clone();
                }
                if let Some(items) = &e.line_items {
                    self.line_items = items.clone();
                }
                self.response_deadline = e.response_deadline.resolve(self.response_deadline);
                self.updated_by = Some(e.updated_by);
                self.updated_at = Some(e.occurred_at);
            }
            RfqEvent::RfqAccepted(e) => {
                self.status = RfqStatus::Accepted;
                self.updated_by = Some(e.accepted_by);
                self.updated_at = Some(e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RfqCommand::CreateRfq(cmd) => self.handle_create(cmd),
            RfqCommand::UpdateRfq(cmd) => self.handle_update(cmd),
            RfqCommand::MarkRfqAccepted(cmd) => self.handle_mark_accepted(cmd),
        }
    }
}

impl Rfq {
    fn ensure_rfq_id(&self, rfq_id: RfqId) -> Result<(), DomainError> {
        if self.id != rfq_id {
            return Err(DomainError::validation("rfq_id mismatch"));
        }
        Ok(())
    }

    fn validate_line_items(items: &[RequirementLineItem]) -> Result<(), DomainError> {
        for item in items {
            if item.quantity == 0 {
                return Err(DomainError::validation("line item quantity must be positive"));
            }
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateRfq) -> Result<Vec<RfqEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("rfq already exists"));
        }
        Self::validate_line_items(&cmd.line_items)?;

        Ok(vec![RfqEvent::RfqCreated(RfqCreated {
            rfq_id: cmd.rfq_id,
            buyers_workspace_id: cmd.buyers_workspace_id,
            invited_seller_contact_ids: cmd.invited_seller_contact_ids.clone(),
            line_items: cmd.line_items.clone(),
            response_deadline: cmd.response_deadline,
            created_by: cmd.created_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateRfq) -> Result<Vec<RfqEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found("rfq does not exist"));
        }
        self.ensure_rfq_id(cmd.rfq_id)?;

        if !self.status.is_open() {
            return Err(DomainError::invalid_state(
                "rfq can no longer be updated once it reached a terminal status",
            ));
        }

        if cmd.status.is_none()
            && cmd.invited_seller_contact_ids.is_none()
            && cmd.line_items.is_none()
            && cmd.response_deadline.is_omitted()
        {
            return Err(DomainError::validation("update contains no changes"));
        }

        if let Some(next) = cmd.status {
            if !can_transition(self.status, next) {
                return Err(DomainError::invalid_state(format!(
                    "cannot transition rfq from {:?} to {:?}",
                    self.status, next
                )));
            }
        }

        if let Some(items) = &cmd.line_items {
            Self::validate_line_items(items)?;
        }

        Ok(vec![RfqEvent::RfqUpdated(RfqUpdated {
            rfq_id: cmd.rfq_id,
            status: cmd.status,
            invited_seller_contact_ids: cmd.invited_seller_contact_ids.clone(),
            line_items: cmd.line_items.clone(),
            response_deadline: cmd.response_deadline,
            updated_by: cmd.updated_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_accepted(&self, cmd: &MarkRfqAccepted) -> Result<Vec<RfqEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found("rfq does not exist"));
        }
        self.ensure_rfq_id(cmd.rfq_id)?;

        if self.status != RfqStatus::Sent {
            return Err(DomainError::invalid_state(
                "only a sent rfq can be accepted",
            ));
        }

        Ok(vec![RfqEvent::RfqAccepted(RfqAccepted {
            rfq_id: cmd.rfq_id,
            accepted_by: cmd.accepted_by,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealdesk_events::execute;

    fn test_rfq_id() -> RfqId {
        RfqId::new(AggregateId::new())
    }

    fn test_workspace_id() -> WorkspaceId {
        WorkspaceId::new()
    }

    fn test_user_id() -> UserId {
        UserId::new()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn rental_item(quantity: u32) -> RequirementLineItem {
        RequirementLineItem {
            description: "Excavator, 14t class".to_string(),
            quantity,
            kind: RequirementKind::Rental {
                pim_category_id: PimCategoryId::new(),
                rental_window: RentalWindow::new(
                    test_time(),
                    test_time() + chrono::Duration::days(7),
                ),
            },
        }
    }

    fn create_cmd(rfq_id: RfqId) -> CreateRfq {
        CreateRfq {
            rfq_id,
            buyers_workspace_id: test_workspace_id(),
            invited_seller_contact_ids: HashSet::from([ContactId::new(), ContactId::new()]),
            line_items: vec![rental_item(2)],
            response_deadline: None,
            created_by: test_user_id(),
            occurred_at: test_time(),
        }
    }

    fn created_rfq(rfq_id: RfqId) -> Rfq {
        let mut rfq = Rfq::empty(rfq_id);
        execute(&mut rfq, &RfqCommand::CreateRfq(create_cmd(rfq_id))).unwrap();
        rfq
    }

    fn sent_rfq(rfq_id: RfqId) -> Rfq {
        let mut rfq = created_rfq(rfq_id);
        execute(
            &mut rfq,
            &RfqCommand::UpdateRfq(UpdateRfq {
                rfq_id,
                status: Some(RfqStatus::Sent),
                invited_seller_contact_ids: None,
                line_items: None,
                response_deadline: Patch::Omitted,
                updated_by: test_user_id(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        rfq
    }

    #[test]
    fn create_rfq_emits_rfq_created_event() {
        let rfq_id = test_rfq_id();
        let rfq = Rfq::empty(rfq_id);
        let cmd = create_cmd(rfq_id);

        let events = rfq.handle(&RfqCommand::CreateRfq(cmd.clone())).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            RfqEvent::RfqCreated(e) => {
                assert_eq!(e.rfq_id, rfq_id);
                assert_eq!(e.buyers_workspace_id, cmd.buyers_workspace_id);
                assert_eq!(e.invited_seller_contact_ids.len(), 2);
            }
            _ => panic!("Expected RfqCreated event"),
        }
    }

    #[test]
    fn create_rejects_zero_quantity_line_item() {
        let rfq_id = test_rfq_id();
        let rfq = Rfq::empty(rfq_id);
        let mut cmd = create_cmd(rfq_id);
        cmd.line_items = vec![rental_item(0)];

        let err = rfq.handle(&RfqCommand::CreateRfq(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn update_replaces_invited_sellers_wholesale() {
        let rfq_id = test_rfq_id();
        let mut rfq = created_rfq(rfq_id);

        let replacement = HashSet::from([ContactId::new()]);
        execute(
            &mut rfq,
            &RfqCommand::UpdateRfq(UpdateRfq {
                rfq_id,
                status: None,
                invited_seller_contact_ids: Some(replacement.clone()),
                line_items: None,
                response_deadline: Patch::Omitted,
                updated_by: test_user_id(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(rfq.invited_seller_contact_ids(), &replacement);
    }

    #[test]
    fn draft_can_only_move_to_sent() {
        let rfq_id = test_rfq_id();
        let rfq = created_rfq(rfq_id);

        for blocked in [
            RfqStatus::Accepted,
            RfqStatus::Rejected,
            RfqStatus::Cancelled,
            RfqStatus::Expired,
        ] {
            let err = rfq
                .handle(&RfqCommand::UpdateRfq(UpdateRfq {
                    rfq_id,
                    status: Some(blocked),
                    invited_seller_contact_ids: None,
                    line_items: None,
                    response_deadline: Patch::Omitted,
                    updated_by: test_user_id(),
                    occurred_at: test_time(),
                }))
                .unwrap_err();
            assert!(matches!(err, DomainError::InvalidState(_)));
        }
    }

    #[test]
    fn sent_reaches_all_terminal_states_directly() {
        for terminal in [
            RfqStatus::Accepted,
            RfqStatus::Rejected,
            RfqStatus::Cancelled,
            RfqStatus::Expired,
        ] {
            let rfq_id = test_rfq_id();
            let mut rfq = sent_rfq(rfq_id);

            execute(
                &mut rfq,
                &RfqCommand::UpdateRfq(UpdateRfq {
                    rfq_id,
                    status: Some(terminal),
                    invited_seller_contact_ids: None,
                    line_items: None,
                    response_deadline: Patch::Omitted,
                    updated_by: test_user_id(),
                    occurred_at: test_time(),
                }),
            )
            .unwrap();
            assert_eq!(rfq.status(), terminal);
        }
    }

    #[test]
    fn terminal_rfq_rejects_further_updates() {
        let rfq_id = test_rfq_id();
        let mut rfq = sent_rfq(rfq_id);
        execute(
            &mut rfq,
            &RfqCommand::UpdateRfq(UpdateRfq {
                rfq_id,
                status: Some(RfqStatus::Cancelled),
                invited_seller_contact_ids: None,
                line_items: None,
                response_deadline: Patch::Omitted,
                updated_by: test_user_id(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        let err = rfq
            .handle(&RfqCommand::UpdateRfq(UpdateRfq {
                rfq_id,
                status: None,
                invited_seller_contact_ids: None,
                line_items: Some(vec![rental_item(1)]),
                response_deadline: Patch::Omitted,
                updated_by: test_user_id(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn response_deadline_is_patchable() {
        let rfq_id = test_rfq_id();
        let mut rfq = created_rfq(rfq_id);
        let deadline = test_time() + chrono::Duration::days(14);

        execute(
            &mut rfq,
            &RfqCommand::UpdateRfq(UpdateRfq {
                rfq_id,
                status: None,
                invited_seller_contact_ids: None,
                line_items: None,
                response_deadline: Patch::Value(deadline),
                updated_by: test_user_id(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(rfq.response_deadline(), Some(deadline));

        // Explicit null clears; omitted would have kept it.
        execute(
            &mut rfq,
            &RfqCommand::UpdateRfq(UpdateRfq {
                rfq_id,
                status: None,
                invited_seller_contact_ids: None,
                line_items: None,
                response_deadline: Patch::Null,
                updated_by: test_user_id(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(rfq.response_deadline(), None);
    }

    #[test]
    fn empty_update_is_rejected() {
        let rfq_id = test_rfq_id();
        let rfq = created_rfq(rfq_id);

        let err = rfq
            .handle(&RfqCommand::UpdateRfq(UpdateRfq {
                rfq_id,
                status: None,
                invited_seller_contact_ids: None,
                line_items: None,
                response_deadline: Patch::Omitted,
                updated_by: test_user_id(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn mark_accepted_requires_sent() {
        let rfq_id = test_rfq_id();
        let rfq = created_rfq(rfq_id);

        let err = rfq
            .handle(&RfqCommand::MarkRfqAccepted(MarkRfqAccepted {
                rfq_id,
                accepted_by: test_user_id(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));

        let mut rfq = sent_rfq(rfq_id);
        execute(
            &mut rfq,
            &RfqCommand::MarkRfqAccepted(MarkRfqAccepted {
                rfq_id,
                accepted_by: test_user_id(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(rfq.status(), RfqStatus::Accepted);
    }

    #[test]
    fn version_increments_on_apply() {
        let rfq_id = test_rfq_id();
        let mut rfq = Rfq::empty(rfq_id);
        assert_eq!(rfq.version(), 0);

        execute(&mut rfq, &RfqCommand::CreateRfq(create_cmd(rfq_id))).unwrap();
        assert_eq!(rfq.version(), 1);

        execute(
            &mut rfq,
            &RfqCommand::UpdateRfq(UpdateRfq {
                rfq_id,
                status: Some(RfqStatus::Sent),
                invited_seller_contact_ids: None,
                line_items: None,
                response_deadline: Patch::Omitted,
                updated_by: test_user_id(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        assert_eq!(rfq.version(), 2);
    }
}
