//! Request-for-quote services: create and update on behalf of the buyer.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

use dealdesk_auth::{Actor, IdentityDirectory, ensure_workspace_manager};
use dealdesk_core::{AggregateId, ContactId, DomainError, Patch, WorkspaceId};
use dealdesk_events::{EventBus, EventEnvelope};
use dealdesk_infra::event_store::EventStore;
use dealdesk_quoting::QuoteStatus;
use dealdesk_rfq::{CreateRfq, RequirementLineItem, Rfq, RfqCommand, RfqId, RfqStatus, UpdateRfq};

use crate::error::EngineResult;
use crate::{Engine, streams};

/// Input for opening a request for quote.
#[derive(Debug, Clone)]
pub struct RfqDraft {
    pub buyers_workspace_id: WorkspaceId,
    pub invited_seller_contact_ids: HashSet<ContactId>,
    pub line_items: Vec<RequirementLineItem>,
    pub response_deadline: Option<DateTime<Utc>>,
}

/// Wholesale-replacement update input.
///
/// `None` leaves a field untouched; a provided set or sequence fully
/// replaces the prior one. The deadline is tri-state so "clear the
/// deadline" and "leave it alone" stay distinguishable.
#[derive(Debug, Clone, Default)]
pub struct RfqChanges {
    pub status: Option<RfqStatus>,
    pub invited_seller_contact_ids: Option<HashSet<ContactId>>,
    pub line_items: Option<Vec<RequirementLineItem>>,
    pub response_deadline: Patch<DateTime<Utc>>,
}

impl<S, B, P, D> Engine<S, B, P, D>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    D: IdentityDirectory,
{
    /// Open a request for quote in the buyer's workspace.
    pub fn create_rfq(&self, actor: Actor, draft: RfqDraft) -> EngineResult<Rfq> {
        ensure_workspace_manager(&self.directory, actor, draft.buyers_workspace_id)
            .map_err(DomainError::from)?;

        let rfq_id = RfqId::new(AggregateId::new());
        let cmd = RfqCommand::CreateRfq(CreateRfq {
            rfq_id,
            buyers_workspace_id: draft.buyers_workspace_id,
            invited_seller_contact_ids: draft.invited_seller_contact_ids,
            line_items: draft.line_items,
            response_deadline: draft.response_deadline,
            created_by: actor.user_id,
            occurred_at: Utc::now(),
        });

        self.dispatcher
            .dispatch(rfq_id.0, streams::RFQ, cmd, |id| Rfq::empty(RfqId::new(id)))?;
        info!(rfq_id = %rfq_id, "rfq created");

        let (rfq, _) = self.load_rfq(rfq_id)?;
        Ok(rfq)
    }

    /// Apply a status change and/or wholesale field replacement to an rfq.
    ///
    /// A direct move to `Accepted` is refused while any quote referencing
    /// this rfq is still active: acceptance then belongs to the quote
    /// acceptance flow, which marks the rfq as part of its transaction.
    pub fn update_rfq(&self, actor: Actor, rfq_id: RfqId, changes: RfqChanges) -> EngineResult<Rfq> {
        let (current, _) = self.load_rfq(rfq_id)?;
        if !current.exists() {
            return Err(DomainError::not_found(format!("rfq {rfq_id} does not exist")).into());
        }
        let workspace_id = current
            .buyers_workspace_id()
            .ok_or_else(|| DomainError::invalid_state("rfq has no owning workspace"))?;
        ensure_workspace_manager(&self.directory, actor, workspace_id)
            .map_err(DomainError::from)?;

        if changes.status == Some(RfqStatus::Accepted) {
            let has_active_quote = self
                .quotes_referencing(rfq_id)?
                .iter()
                .any(|(quote, _)| quote.status() == QuoteStatus::Active);
            if has_active_quote {
                return Err(DomainError::invalid_state(
                    "rfq acceptance goes through quote acceptance while quotes are active",
                )
                .into());
            }
        }

        let cmd = RfqCommand::UpdateRfq(UpdateRfq {
            rfq_id,
            status: changes.status,
            invited_seller_contact_ids: changes.invited_seller_contact_ids,
            line_items: changes.line_items,
            response_deadline: changes.response_deadline,
            updated_by: actor.user_id,
            occurred_at: Utc::now(),
        });

        self.dispatcher
            .dispatch(rfq_id.0, streams::RFQ, cmd, |id| Rfq::empty(RfqId::new(id)))?;
        info!(rfq_id = %rfq_id, status = ?changes.status, "rfq updated");

        let (rfq, _) = self.load_rfq(rfq_id)?;
        Ok(rfq)
    }
}
