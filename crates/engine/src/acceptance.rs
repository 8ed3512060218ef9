//! Quote acceptance and rejection.
//!
//! Acceptance is the five-way write at the heart of the workflow: the
//! accepted quote, every active sibling quote on the same rfq, the rfq
//! itself, the materialized sales order, and (iff the buyer has a workspace)
//! the materialized purchase order all advance in one event store
//! transaction. Each stream's expected version comes from the load phase, so
//! the `status == ACTIVE` guard is effectively re-checked at commit: a
//! concurrent acceptance of the same quote, or of a sibling, bumps a stream
//! version and fails the whole batch with `Conflict`.

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::info;

use dealdesk_auth::{
    Actor, DecisionKind, IdentityDirectory, QuoteParties, authorize_quote_decision,
};
use dealdesk_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use dealdesk_events::{EventBus, EventEnvelope};
use dealdesk_infra::event_store::EventStore;
use dealdesk_orders::{
    CreatePurchaseOrder, CreateSalesOrder, PurchaseOrder, PurchaseOrderCommand, PurchaseOrderId,
    SalesOrder, SalesOrderCommand, SalesOrderId,
};
use dealdesk_quoting::{AcceptQuote, Quote, QuoteCommand, QuoteId, QuoteStatus, RejectQuote};
use dealdesk_rfq::{MarkRfqAccepted, RfqCommand};

use crate::error::EngineResult;
use crate::materializer::expand_revision_line_items;
use crate::{Engine, streams};

/// Caller-supplied acceptance details beyond the actor identity.
#[derive(Debug, Clone, Default)]
pub struct AcceptanceRequest {
    /// Required when a seller manager accepts on the buyer's behalf.
    pub approval_confirmation: Option<String>,
    /// Recorded on the quote when the accepting buyer signs with a name.
    pub buyer_accepted_full_legal_name: Option<String>,
}

/// Documents produced by a successful acceptance.
#[derive(Debug, Clone)]
pub struct AcceptanceOutcome {
    pub quote: Quote,
    pub sales_order: SalesOrder,
    pub purchase_order: Option<PurchaseOrder>,
}

impl<S, B, P, D> Engine<S, B, P, D>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    D: IdentityDirectory,
{
    /// Accept a quote, materializing orders and cascading rejection.
    ///
    /// See the module docs for the transaction shape. Returns the accepted
    /// quote together with the sales order and, when the buyer has a
    /// workspace, the purchase order.
    pub fn accept_quote(
        &self,
        actor: Actor,
        quote_id: QuoteId,
        request: AcceptanceRequest,
    ) -> EngineResult<AcceptanceOutcome> {
        let occurred_at = Utc::now();

        let (quote, quote_version) = self.load_quote(quote_id)?;
        if !quote.exists() {
            return Err(DomainError::not_found(format!("quote {quote_id} does not exist")).into());
        }

        let parties = quote_parties(&quote)?;
        authorize_quote_decision(
            &self.directory,
            actor,
            &parties,
            DecisionKind::Accept,
            request.approval_confirmation.as_deref(),
        )
        .map_err(DomainError::from)?;

        // The aggregate enforces the ACTIVE guard, the current-revision
        // guard, and revision expiry.
        let accept_cmd = QuoteCommand::AcceptQuote(AcceptQuote {
            quote_id,
            accepted_by: actor.user_id,
            buyer_accepted_full_legal_name: request.buyer_accepted_full_legal_name.clone(),
            occurred_at,
        });
        let quote_events = quote.handle(&accept_cmd)?;

        let revision = quote
            .current_revision()
            .ok_or_else(|| DomainError::invalid_state("quote has no current revision"))?;
        let seller_workspace_id = parties.seller_workspace_id;
        let project_id = require(quote.sellers_project_id(), "project")?;
        let buyer_contact_id = parties.sellers_buyer_contact_id;

        let mut batches = vec![self.stream_append(
            quote_id.0,
            streams::QUOTE,
            ExpectedVersion::Exact(quote_version),
            &quote_events,
        )?];

        // Cascading competitive rejection plus the rfq's own transition.
        let mut rejected_siblings = 0usize;
        if let Some(rfq_id) = quote.rfq_id() {
            for (sibling, sibling_version) in self.quotes_referencing(rfq_id)? {
                if sibling.id_typed() == quote_id || sibling.status() != QuoteStatus::Active {
                    continue;
                }
                let sibling_id = sibling.id_typed();
                let reject_cmd = QuoteCommand::RejectQuote(RejectQuote {
                    quote_id: sibling_id,
                    rejected_by: actor.user_id,
                    cascaded: true,
                    occurred_at,
                });
                let sibling_events = sibling.handle(&reject_cmd)?;
                batches.push(self.stream_append(
                    sibling_id.0,
                    streams::QUOTE,
                    ExpectedVersion::Exact(sibling_version),
                    &sibling_events,
                )?);
                rejected_siblings += 1;
            }

            let (rfq, rfq_version) = self.load_rfq(rfq_id)?;
            let mark_cmd = RfqCommand::MarkRfqAccepted(MarkRfqAccepted {
                rfq_id,
                accepted_by: actor.user_id,
                occurred_at,
            });
            let rfq_events = rfq.handle(&mark_cmd)?;
            batches.push(self.stream_append(
                rfq_id.0,
                streams::RFQ,
                ExpectedVersion::Exact(rfq_version),
                &rfq_events,
            )?);
        }

        // Seller-side document.
        let sales_order_id = SalesOrderId::new(AggregateId::new());
        let so_cmd = SalesOrderCommand::CreateSalesOrder(CreateSalesOrder {
            order_id: sales_order_id,
            workspace_id: seller_workspace_id,
            project_id,
            buyer_contact_id,
            line_items: expand_revision_line_items(revision),
            created_by: actor.user_id,
            occurred_at,
        });
        let so_events = SalesOrder::empty(sales_order_id).handle(&so_cmd)?;
        batches.push(self.stream_append(
            sales_order_id.0,
            streams::SALES_ORDER,
            ExpectedVersion::Exact(0),
            &so_events,
        )?);

        // Buyer-side document, only when the buyer has a workspace.
        let purchase_order_id = match quote.buyer_workspace_id() {
            Some(buyer_workspace_id) => {
                let purchase_order_id = PurchaseOrderId::new(AggregateId::new());
                let po_cmd = PurchaseOrderCommand::CreatePurchaseOrder(CreatePurchaseOrder {
                    order_id: purchase_order_id,
                    workspace_id: buyer_workspace_id,
                    project_id: None,
                    seller_workspace_id,
                    line_items: expand_revision_line_items(revision),
                    created_by: actor.user_id,
                    occurred_at,
                });
                let po_events = PurchaseOrder::empty(purchase_order_id).handle(&po_cmd)?;
                batches.push(self.stream_append(
                    purchase_order_id.0,
                    streams::PURCHASE_ORDER,
                    ExpectedVersion::Exact(0),
                    &po_events,
                )?);
                Some(purchase_order_id)
            }
            None => None,
        };

        let committed = self.store.append_transaction(batches)?;
        self.publish_all(&committed)?;
        info!(
            quote_id = %quote_id,
            sales_order_id = %sales_order_id,
            rejected_siblings,
            "quote accepted"
        );

        let (quote, _) = self.load_quote(quote_id)?;
        let (sales_order, _) = self.load_sales_order(sales_order_id)?;
        let purchase_order = match purchase_order_id {
            Some(id) => Some(self.load_purchase_order(id)?.0),
            None => None,
        };

        Ok(AcceptanceOutcome {
            quote,
            sales_order,
            purchase_order,
        })
    }

    /// Reject a quote. Does not touch the rfq or sibling quotes.
    pub fn reject_quote(&self, actor: Actor, quote_id: QuoteId) -> EngineResult<Quote> {
        let (quote, _) = self.load_quote(quote_id)?;
        if !quote.exists() {
            return Err(DomainError::not_found(format!("quote {quote_id} does not exist")).into());
        }

        let parties = quote_parties(&quote)?;
        authorize_quote_decision(&self.directory, actor, &parties, DecisionKind::Reject, None)
            .map_err(DomainError::from)?;

        let cmd = QuoteCommand::RejectQuote(RejectQuote {
            quote_id,
            rejected_by: actor.user_id,
            cascaded: false,
            occurred_at: Utc::now(),
        });

        self.dispatcher
            .dispatch(quote_id.0, streams::QUOTE, cmd, |id| {
                Quote::empty(QuoteId::new(id))
            })?;
        info!(quote_id = %quote_id, "quote rejected");

        let (quote, _) = self.load_quote(quote_id)?;
        Ok(quote)
    }
}

/// Project the authorization-relevant parties out of a loaded quote.
pub(crate) fn quote_parties(quote: &Quote) -> Result<QuoteParties, DomainError> {
    Ok(QuoteParties {
        seller_workspace_id: require(quote.seller_workspace_id(), "seller workspace")?,
        buyer_workspace_id: quote.buyer_workspace_id(),
        sellers_buyer_contact_id: require(quote.sellers_buyer_contact_id(), "buyer contact")?,
    })
}

fn require<T>(value: Option<T>, what: &str) -> Result<T, DomainError> {
    value.ok_or_else(|| DomainError::invalid_state(format!("quote is missing {what}")))
}
