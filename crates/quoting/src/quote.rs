use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dealdesk_core::{
    Aggregate, AggregateId, AggregateRoot, ContactId, DomainError, Entity, IntakeFormLineItemId,
    PimCategoryId, PriceId, ProjectId, QuoteLineItemId, RentalWindow, RevisionId, UserId,
    WorkspaceId,
};
use dealdesk_events::Event;
use dealdesk_rfq::RfqId;

/// Quote identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteId(pub AggregateId);

impl QuoteId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for QuoteId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Quote status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Draft,
    Active,
    Accepted,
    Rejected,
}

/// Revision status lifecycle. A revision is `Sent` while the buyer is acting
/// on it and `Superseded` once a newer revision has been sent in its place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionStatus {
    Draft,
    Sent,
    Superseded,
}

/// Kind-specific line item data (closed sum type, `kind` discriminant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QuoteLineItemKind {
    Rental {
        pim_category_id: PimCategoryId,
        rental_window: RentalWindow,
    },
    Sale {
        pim_category_id: PimCategoryId,
    },
    Service,
}

/// A priced (or yet-to-be-priced) line on a quote revision.
///
/// `subtotal_in_cents` is zero whenever `sellers_price_id` is unset; a priced
/// item carries the resolver-computed amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteLineItem {
    pub id: QuoteLineItemId,
    pub description: String,
    pub quantity: u32,
    pub sellers_price_id: Option<PriceId>,
    pub subtotal_in_cents: i64,
    pub delivery_method: Option<String>,
    pub delivery_location: Option<String>,
    pub delivery_notes: Option<String>,
    pub intake_form_submission_line_item_id: Option<IntakeFormLineItemId>,
    #[serde(flatten)]
    pub kind: QuoteLineItemKind,
}

impl Entity for QuoteLineItem {
    type Id = QuoteLineItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A versioned, priced snapshot of the quote's line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRevision {
    pub id: RevisionId,
    pub revision_number: u32,
    pub status: RevisionStatus,
    pub valid_until: Option<DateTime<Utc>>,
    pub line_items: Vec<QuoteLineItem>,
}

impl QuoteRevision {
    pub fn has_unpriced_line_items(&self) -> bool {
        self.line_items
            .iter()
            .any(|item| item.sellers_price_id.is_none())
    }

    pub fn total_in_cents(&self) -> i64 {
        self.line_items.iter().map(|item| item.subtotal_in_cents).sum()
    }
}

impl Entity for QuoteRevision {
    type Id = RevisionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Aggregate root: Quote.
///
/// Owns the append-only revision history; `current_revision_id` is a pointer
/// into it. `rfq_id` is a weak reference resolved at the application layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    id: QuoteId,
    rfq_id: Option<RfqId>,
    seller_workspace_id: Option<WorkspaceId>,
    buyer_workspace_id: Option<WorkspaceId>,
    sellers_buyer_contact_id: Option<ContactId>,
    sellers_project_id: Option<ProjectId>,
    status: QuoteStatus,
    current_revision_id: Option<RevisionId>,
    buyer_accepted_full_legal_name: Option<String>,
    revisions: Vec<QuoteRevision>,
    created_by: Option<UserId>,
    created_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Quote {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: QuoteId) -> Self {
        Self {
            id,
            rfq_id: None,
            seller_workspace_id: None,
            buyer_workspace_id: None,
            sellers_buyer_contact_id: None,
            sellers_project_id: None,
            status: QuoteStatus::Draft,
            current_revision_id: None,
            buyer_accepted_full_legal_name: None,
            revisions: Vec::new(),
            created_by: None,
            created_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> QuoteId {
        self.id
    }

    pub fn rfq_id(&self) -> Option<RfqId> {
        self.rfq_id
    }

    pub fn seller_workspace_id(&self) -> Option<WorkspaceId> {
        self.seller_workspace_id
    }

    pub fn buyer_workspace_id(&self) -> Option<WorkspaceId> {
        self.buyer_workspace_id
    }

    pub fn sellers_buyer_contact_id(&self) -> Option<ContactId> {
        self.sellers_buyer_contact_id
    }

    pub fn sellers_project_id(&self) -> Option<ProjectId> {
        self.sellers_project_id
    }

    pub fn status(&self) -> QuoteStatus {
        self.status
    }

    pub fn current_revision_id(&self) -> Option<RevisionId> {
        self.current_revision_id
    }

    pub fn buyer_accepted_full_legal_name(&self) -> Option<&str> {
        self.buyer_accepted_full_legal_name.as_deref()
    }

    pub fn revisions(&self) -> &[QuoteRevision] {
        &self.revisions
    }

    pub fn revision(&self, revision_id: RevisionId) -> Option<&QuoteRevision> {
        self.revisions.iter().find(|r| r.id == revision_id)
    }

    pub fn current_revision(&self) -> Option<&QuoteRevision> {
        self.current_revision_id.and_then(|id| self.revision(id))
    }

    pub fn next_revision_number(&self) -> u32 {
        self.revisions
            .last()
            .map(|r| r.revision_number)
            .unwrap_or(0)
            + 1
    }

    pub fn exists(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Quote {
    type Id = QuoteId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateQuote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateQuote {
    pub quote_id: QuoteId,
    pub rfq_id: Option<RfqId>,
    pub seller_workspace_id: WorkspaceId,
    pub buyer_workspace_id: Option<WorkspaceId>,
    pub sellers_buyer_contact_id: ContactId,
    pub sellers_project_id: ProjectId,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CreateQuoteRevision.
///
/// Line items arrive fully resolved (subtotals already computed); the
/// aggregate validates consistency, not prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateQuoteRevision {
    pub quote_id: QuoteId,
    pub revision_id: RevisionId,
    pub revision_number: u32,
    pub valid_until: Option<DateTime<Utc>>,
    pub line_items: Vec<QuoteLineItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateQuoteRevision. Replaces the full line item sequence of a
/// draft revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateQuoteRevision {
    pub quote_id: QuoteId,
    pub revision_id: RevisionId,
    pub line_items: Vec<QuoteLineItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SendQuote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendQuote {
    pub quote_id: QuoteId,
    pub revision_id: RevisionId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AcceptQuote. Authorization happens before this command is
/// dispatched; the aggregate only records who accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptQuote {
    pub quote_id: QuoteId,
    pub accepted_by: UserId,
    pub buyer_accepted_full_legal_name: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectQuote. `cascaded` marks rejections triggered by a sibling
/// quote's acceptance rather than an explicit actor decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectQuote {
    pub quote_id: QuoteId,
    pub rejected_by: UserId,
    pub cascaded: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteCommand {
    CreateQuote(CreateQuote),
    CreateQuoteRevision(CreateQuoteRevision),
    UpdateQuoteRevision(UpdateQuoteRevision),
    SendQuote(SendQuote),
    AcceptQuote(AcceptQuote),
    RejectQuote(RejectQuote),
}

/// Event: QuoteCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteCreated {
    pub quote_id: QuoteId,
    pub rfq_id: Option<RfqId>,
    pub seller_workspace_id: WorkspaceId,
    pub buyer_workspace_id: Option<WorkspaceId>,
    pub sellers_buyer_contact_id: ContactId,
    pub sellers_project_id: ProjectId,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuoteRevisionCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRevisionCreated {
    pub quote_id: QuoteId,
    pub revision_id: RevisionId,
    pub revision_number: u32,
    pub valid_until: Option<DateTime<Utc>>,
    pub line_items: Vec<QuoteLineItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuoteRevisionUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRevisionUpdated {
    pub quote_id: QuoteId,
    pub revision_id: RevisionId,
    pub line_items: Vec<QuoteLineItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuoteSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSent {
    pub quote_id: QuoteId,
    pub revision_id: RevisionId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuoteAccepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteAccepted {
    pub quote_id: QuoteId,
    pub revision_id: RevisionId,
    pub accepted_by: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_accepted_full_legal_name: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuoteRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRejected {
    pub quote_id: QuoteId,
    pub rejected_by: UserId,
    pub cascaded: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteEvent {
    QuoteCreated(QuoteCreated),
    QuoteRevisionCreated(QuoteRevisionCreated),
    QuoteRevisionUpdated(QuoteRevisionUpdated),
    QuoteSent(QuoteSent),
    QuoteAccepted(QuoteAccepted),
    QuoteRejected(QuoteRejected),
}

impl Event for QuoteEvent {
    fn event_type(&self) -> &'static str {
        match self {
            QuoteEvent::QuoteCreated(_) => "quoting.quote.created",
            QuoteEvent::QuoteRevisionCreated(_) => "quoting.quote.revision_created",
            QuoteEvent::QuoteRevisionUpdated(_) => "quoting.quote.revision_updated",
            QuoteEvent::QuoteSent(_) => "quoting.quote.sent",
            QuoteEvent::QuoteAccepted(_) => "quoting.quote.accepted",
            QuoteEvent::QuoteRejected(_) => "quoting.quote.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            QuoteEvent::QuoteCreated(e) => e.occurred_at,
            QuoteEvent::QuoteRevisionCreated(e) => e.occurred_at,
            QuoteEvent::QuoteRevisionUpdated(e) => e.occurred_at,
            QuoteEvent::QuoteSent(e) => e.occurred_at,
            QuoteEvent::QuoteAccepted(e) => e.occurred_at,
            QuoteEvent::QuoteRejected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Quote {
    type Command = QuoteCommand;
    type Event = QuoteEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            QuoteEvent::QuoteCreated(e) => {
                self.id = e.quote_id;
                self.rfq_id = e.rfq_id;
                self.seller_workspace_id = Some(e.seller_workspace_id);
                self.buyer_workspace_id = e.buyer_workspace_id;
                self.sellers_buyer_contact_id = Some(e.sellers_buyer_contact_id);
                self.sellers_project_id = Some(e.sellers_project_id);
                self.status = QuoteStatus::Draft;
                self.created_by = Some(e.created_by);
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            QuoteEvent::QuoteRevisionCreated(e) => {
                self.revisions.push(QuoteRevision {
                    id: e.revision_id,
                    revision_number: e.revision_number,
                    status: RevisionStatus::Draft,
                    valid_until: e.valid_until,
                    line_items: e.line_items.clone(),
                });
            }
            QuoteEvent::QuoteRevisionUpdated(e) => {
                if let Some(revision) =
                    self.revisions.iter_mut().find(|r| r.id == e.revision_id)
                {
                    revision.line_items = e.line_items.clone();
                }
            }
            QuoteEvent::QuoteSent(e) => {
                for revision in &mut self.revisions {
                    if revision.id == e.revision_id {
                        revision.status = RevisionStatus::Sent;
                    } else if revision.status != RevisionStatus::Superseded {
                        revision.status = RevisionStatus::Superseded;
                    }
                }
                self.status = QuoteStatus::Active;
                self.current_revision_id = Some(e.revision_id);
            }
            QuoteEvent::QuoteAccepted(e) => {
                self.status = QuoteStatus::Accepted;
                if e.buyer_accepted_full_legal_name.is_some() {
                    self.buyer_accepted_full_legal_name =
                        e.buyer_accepted_full_legal_name.clone();
                }
            }
            QuoteEvent::QuoteRejected(_) => {
                self.status = QuoteStatus::Rejected;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            QuoteCommand::CreateQuote(cmd) => self.handle_create(cmd),
            QuoteCommand::CreateQuoteRevision(cmd) => self.handle_create_revision(cmd),
            QuoteCommand::UpdateQuoteRevision(cmd) => self.handle_update_revision(cmd),
            QuoteCommand::SendQuote(cmd) => self.handle_send(cmd),
            QuoteCommand::AcceptQuote(cmd) => self.handle_accept(cmd),
            QuoteCommand::RejectQuote(cmd) => self.handle_reject(cmd),
        }
    }
}

impl Quote {
    fn ensure_exists(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("quote does not exist"));
        }
        Ok(())
    }

    fn ensure_quote_id(&self, quote_id: QuoteId) -> Result<(), DomainError> {
        if self.id != quote_id {
            return Err(DomainError::validation("quote_id mismatch"));
        }
        Ok(())
    }

    fn ensure_revisable(&self) -> Result<(), DomainError> {
        if !matches!(self.status, QuoteStatus::Draft | QuoteStatus::Active) {
            return Err(DomainError::invalid_state(
                "quote revisions are frozen once the quote is accepted or rejected",
            ));
        }
        Ok(())
    }

    fn validate_line_items(items: &[QuoteLineItem]) -> Result<(), DomainError> {
        for item in items {
            if item.quantity == 0 {
                return Err(DomainError::validation("line item quantity must be positive"));
            }
            if item.subtotal_in_cents < 0 {
                return Err(DomainError::validation(
                    "line item subtotal cannot be negative",
                ));
            }
            if item.sellers_price_id.is_none() && item.subtotal_in_cents != 0 {
                return Err(DomainError::validation(
                    "unpriced line item must carry a zero subtotal",
                ));
            }
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateQuote) -> Result<Vec<QuoteEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("quote already exists"));
        }

        Ok(vec![QuoteEvent::QuoteCreated(QuoteCreated {
            quote_id: cmd.quote_id,
            rfq_id: cmd.rfq_id,
            seller_workspace_id: cmd.seller_workspace_id,
            buyer_workspace_id: cmd.buyer_workspace_id,
            sellers_buyer_contact_id: cmd.sellers_buyer_contact_id,
            sellers_project_id: cmd.sellers_project_id,
            created_by: cmd.created_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_create_revision(
        &self,
        cmd: &CreateQuoteRevision,
    ) -> Result<Vec<QuoteEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_quote_id(cmd.quote_id)?;
        self.ensure_revisable()?;

        if self.revision(cmd.revision_id).is_some() {
            return Err(DomainError::conflict("revision already exists"));
        }
        if cmd.revision_number != self.next_revision_number() {
            return Err(DomainError::validation(format!(
                "revision_number must be {} (got {})",
                self.next_revision_number(),
                cmd.revision_number
            )));
        }
        Self::validate_line_items(&cmd.line_items)?;

        Ok(vec![QuoteEvent::QuoteRevisionCreated(QuoteRevisionCreated {
            quote_id: cmd.quote_id,
            revision_id: cmd.revision_id,
            revision_number: cmd.revision_number,
            valid_until: cmd.valid_until,
            line_items: cmd.line_items.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_revision(
        &self,
        cmd: &UpdateQuoteRevision,
    ) -> Result<Vec<QuoteEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_quote_id(cmd.quote_id)?;
        self.ensure_revisable()?;

        let revision = self
            .revision(cmd.revision_id)
            .ok_or_else(|| DomainError::not_found("revision does not exist"))?;
        if revision.status != RevisionStatus::Draft {
            return Err(DomainError::invalid_state(
                "only a draft revision can be updated",
            ));
        }
        Self::validate_line_items(&cmd.line_items)?;

        Ok(vec![QuoteEvent::QuoteRevisionUpdated(QuoteRevisionUpdated {
            quote_id: cmd.quote_id,
            revision_id: cmd.revision_id,
            line_items: cmd.line_items.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_send(&self, cmd: &SendQuote) -> Result<Vec<QuoteEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_quote_id(cmd.quote_id)?;
        self.ensure_revisable()?;

        let revision = self
            .revision(cmd.revision_id)
            .ok_or_else(|| DomainError::not_found("revision does not exist"))?;
        if revision.status != RevisionStatus::Draft {
            return Err(DomainError::invalid_state(
                "revision was already sent or superseded",
            ));
        }
        if revision.has_unpriced_line_items() {
            return Err(DomainError::validation(
                "cannot send a quote with unpriced line items",
            ));
        }

        Ok(vec![QuoteEvent::QuoteSent(QuoteSent {
            quote_id: cmd.quote_id,
            revision_id: cmd.revision_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_accept(&self, cmd: &AcceptQuote) -> Result<Vec<QuoteEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_quote_id(cmd.quote_id)?;

        if self.status != QuoteStatus::Active {
            return Err(DomainError::invalid_state(
                "only an active quote can be accepted",
            ));
        }
        let revision_id = self
            .current_revision_id
            .ok_or_else(|| DomainError::invalid_state("quote has no current revision"))?;
        let revision = self
            .revision(revision_id)
            .ok_or_else(|| DomainError::not_found("current revision not found"))?;
        if let Some(valid_until) = revision.valid_until {
            if valid_until < cmd.occurred_at {
                return Err(DomainError::expired(format!(
                    "quote revision expired on {valid_until}"
                )));
            }
        }

        Ok(vec![QuoteEvent::QuoteAccepted(QuoteAccepted {
            quote_id: cmd.quote_id,
            revision_id,
            accepted_by: cmd.accepted_by,
            buyer_accepted_full_legal_name: cmd.buyer_accepted_full_legal_name.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectQuote) -> Result<Vec<QuoteEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_quote_id(cmd.quote_id)?;

        if self.status != QuoteStatus::Active {
            return Err(DomainError::invalid_state(
                "only an active quote can be rejected",
            ));
        }

        Ok(vec![QuoteEvent::QuoteRejected(QuoteRejected {
            quote_id: cmd.quote_id,
            rejected_by: cmd.rejected_by,
            cascaded: cmd.cascaded,
            occurred_at: cmd.occurred_at,
        })])
    }
}
