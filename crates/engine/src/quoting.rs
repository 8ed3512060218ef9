//! Quote services: open quotes, draft and price revisions, send to the buyer.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

use dealdesk_auth::{Actor, IdentityDirectory, ensure_workspace_manager};
use dealdesk_core::{AggregateId, ContactId, DomainError, ProjectId, RevisionId, WorkspaceId};
use dealdesk_events::{EventBus, EventEnvelope};
use dealdesk_infra::event_store::EventStore;
use dealdesk_quoting::{
    CreateQuote, CreateQuoteRevision, PricingResolver, Quote, QuoteCommand, QuoteId,
    QuoteLineItemDraft, SendQuote, UpdateQuoteRevision, carry_forward_tracking, price_line_items,
};
use dealdesk_rfq::{RfqId, RfqStatus};

use crate::error::EngineResult;
use crate::{Engine, streams};

/// Input for opening a quote.
#[derive(Debug, Clone)]
pub struct QuoteDraft {
    pub rfq_id: Option<RfqId>,
    pub seller_workspace_id: WorkspaceId,
    pub buyer_workspace_id: Option<WorkspaceId>,
    pub sellers_buyer_contact_id: ContactId,
    pub sellers_project_id: ProjectId,
}

/// Input for a new revision: caller-declared number plus unpriced line item
/// drafts (priced here before the aggregate sees them).
#[derive(Debug, Clone)]
pub struct RevisionDraft {
    pub revision_number: u32,
    pub valid_until: Option<DateTime<Utc>>,
    pub line_items: Vec<QuoteLineItemDraft>,
}

impl<S, B, P, D> Engine<S, B, P, D>
where
    S: EventStore,
{
    /// All quotes whose weak `rfq_id` reference names the given rfq.
    pub(crate) fn quotes_referencing(&self, rfq_id: RfqId) -> EngineResult<Vec<(Quote, u64)>> {
        let mut quotes = Vec::new();
        for id in self.store.stream_ids_of_type(streams::QUOTE)? {
            let (quote, version) = self.load_quote(QuoteId::new(id))?;
            if quote.rfq_id() == Some(rfq_id) {
                quotes.push((quote, version));
            }
        }
        Ok(quotes)
    }
}

impl<S, B, P, D> Engine<S, B, P, D>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    P: PricingResolver,
    D: IdentityDirectory,
{
    /// Open a quote in the seller's workspace, optionally against an rfq.
    ///
    /// A referenced rfq must exist and be `Sent`; quoting against a draft or
    /// terminal rfq is refused.
    pub fn create_quote(&self, actor: Actor, draft: QuoteDraft) -> EngineResult<Quote> {
        ensure_workspace_manager(&self.directory, actor, draft.seller_workspace_id)
            .map_err(DomainError::from)?;

        if let Some(rfq_id) = draft.rfq_id {
            let (rfq, _) = self.load_rfq(rfq_id)?;
            if !rfq.exists() {
                return Err(DomainError::not_found(format!("rfq {rfq_id} does not exist")).into());
            }
            if rfq.status() != RfqStatus::Sent {
                return Err(DomainError::invalid_state(
                    "quotes may only be opened against a sent rfq",
                )
                .into());
            }
        }

        let quote_id = QuoteId::new(AggregateId::new());
        let cmd = QuoteCommand::CreateQuote(CreateQuote {
            quote_id,
            rfq_id: draft.rfq_id,
            seller_workspace_id: draft.seller_workspace_id,
            buyer_workspace_id: draft.buyer_workspace_id,
            sellers_buyer_contact_id: draft.sellers_buyer_contact_id,
            sellers_project_id: draft.sellers_project_id,
            created_by: actor.user_id,
            occurred_at: Utc::now(),
        });

        self.dispatcher
            .dispatch(quote_id.0, streams::QUOTE, cmd, |id| {
                Quote::empty(QuoteId::new(id))
            })?;
        info!(quote_id = %quote_id, rfq_id = ?draft.rfq_id, "quote created");

        let (quote, _) = self.load_quote(quote_id)?;
        Ok(quote)
    }

    /// Add a revision to a quote, pricing its line items on the way in.
    pub fn create_quote_revision(
        &self,
        actor: Actor,
        quote_id: QuoteId,
        draft: RevisionDraft,
    ) -> EngineResult<Quote> {
        self.require_sellers_quote(actor, quote_id)?;

        let line_items = price_line_items(&self.pricing, draft.line_items)?;
        let revision_id = RevisionId::new();
        let cmd = QuoteCommand::CreateQuoteRevision(CreateQuoteRevision {
            quote_id,
            revision_id,
            revision_number: draft.revision_number,
            valid_until: draft.valid_until,
            line_items,
            occurred_at: Utc::now(),
        });

        self.dispatcher
            .dispatch(quote_id.0, streams::QUOTE, cmd, |id| {
                Quote::empty(QuoteId::new(id))
            })?;
        info!(
            quote_id = %quote_id,
            revision_id = %revision_id,
            revision_number = draft.revision_number,
            "quote revision created"
        );

        let (quote, _) = self.load_quote(quote_id)?;
        Ok(quote)
    }

    /// Replace the line item sequence of a draft revision.
    ///
    /// Incoming drafts that resend an existing line item without its
    /// tracking reference keep the prior value; an explicit null clears it.
    pub fn update_quote_revision(
        &self,
        actor: Actor,
        quote_id: QuoteId,
        revision_id: RevisionId,
        line_items: Vec<QuoteLineItemDraft>,
    ) -> EngineResult<Quote> {
        let (quote, _) = self.require_sellers_quote(actor, quote_id)?;

        let prior = quote
            .revision(revision_id)
            .ok_or_else(|| DomainError::not_found(format!("revision {revision_id} not found")))?;
        let drafts = carry_forward_tracking(&prior.line_items, line_items);
        let line_items = price_line_items(&self.pricing, drafts)?;

        let cmd = QuoteCommand::UpdateQuoteRevision(UpdateQuoteRevision {
            quote_id,
            revision_id,
            line_items,
            occurred_at: Utc::now(),
        });

        self.dispatcher
            .dispatch(quote_id.0, streams::QUOTE, cmd, |id| {
                Quote::empty(QuoteId::new(id))
            })?;
        info!(quote_id = %quote_id, revision_id = %revision_id, "quote revision updated");

        let (quote, _) = self.load_quote(quote_id)?;
        Ok(quote)
    }

    /// Send a revision to the buyer, activating the quote.
    pub fn send_quote(
        &self,
        actor: Actor,
        quote_id: QuoteId,
        revision_id: RevisionId,
    ) -> EngineResult<Quote> {
        self.require_sellers_quote(actor, quote_id)?;

        let cmd = QuoteCommand::SendQuote(SendQuote {
            quote_id,
            revision_id,
            occurred_at: Utc::now(),
        });

        self.dispatcher
            .dispatch(quote_id.0, streams::QUOTE, cmd, |id| {
                Quote::empty(QuoteId::new(id))
            })?;
        info!(quote_id = %quote_id, revision_id = %revision_id, "quote sent");

        let (quote, _) = self.load_quote(quote_id)?;
        Ok(quote)
    }

    /// Load a quote and require the actor to manage its seller workspace.
    fn require_sellers_quote(
        &self,
        actor: Actor,
        quote_id: QuoteId,
    ) -> EngineResult<(Quote, u64)> {
        let (quote, version) = self.load_quote(quote_id)?;
        if !quote.exists() {
            return Err(DomainError::not_found(format!("quote {quote_id} does not exist")).into());
        }
        let seller_workspace_id = quote
            .seller_workspace_id()
            .ok_or_else(|| DomainError::invalid_state("quote has no seller workspace"))?;
        ensure_workspace_manager(&self.directory, actor, seller_workspace_id)
            .map_err(DomainError::from)?;
        Ok((quote, version))
    }
}
