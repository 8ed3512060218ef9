//! Caller-facing line item input and its resolution into priced line items.
//!
//! Callers resend full line item lists; the tri-state tracking field keeps
//! "omitted" distinguishable from "explicitly cleared" across that pattern.

use serde::{Deserialize, Serialize};

use dealdesk_core::{DomainResult, IntakeFormLineItemId, Patch, PriceId, QuoteLineItemId};

use crate::pricing::PricingResolver;
use crate::quote::{QuoteLineItem, QuoteLineItemKind};

/// Unpriced line item input as submitted by a caller.
///
/// `id` is present when the caller is resending an existing line item of the
/// revision; absent ids mean a new line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteLineItemDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<QuoteLineItemId>,
    pub description: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sellers_price_id: Option<PriceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Patch::is_omitted")]
    pub intake_form_submission_line_item_id: Patch<IntakeFormLineItemId>,
    #[serde(flatten)]
    pub kind: QuoteLineItemKind,
}

/// Carry tracking references forward from the revision's prior line items.
///
/// A resent line item (matching `id`) whose tracking field was omitted keeps
/// the prior value; an explicit null stays a clear.
pub fn carry_forward_tracking(
    prior: &[QuoteLineItem],
    drafts: Vec<QuoteLineItemDraft>,
) -> Vec<QuoteLineItemDraft> {
    drafts
        .into_iter()
        .map(|mut draft| {
            if draft.intake_form_submission_line_item_id.is_omitted() {
                if let Some(id) = draft.id {
                    if let Some(tracking) = prior
                        .iter()
                        .find(|item| item.id == id)
                        .and_then(|item| item.intake_form_submission_line_item_id)
                    {
                        draft.intake_form_submission_line_item_id = Patch::Value(tracking);
                    }
                }
            }
            draft
        })
        .collect()
}

/// Resolve drafts into priced line items.
///
/// Items without a price reference get a zero subtotal; priced items go
/// through the resolver, with the rental window as duration input where the
/// kind carries one. New items are assigned fresh identifiers.
pub fn price_line_items<P>(
    resolver: &P,
    drafts: Vec<QuoteLineItemDraft>,
) -> DomainResult<Vec<QuoteLineItem>>
where
    P: PricingResolver + ?Sized,
{
    drafts
        .into_iter()
        .map(|draft| {
            let subtotal_in_cents = match draft.sellers_price_id {
                Some(price_id) => {
                    let rental_window = match &draft.kind {
                        QuoteLineItemKind::Rental { rental_window, .. } => Some(rental_window),
                        _ => None,
                    };
                    resolver.resolve_subtotal(price_id, draft.quantity, rental_window)?
                }
                None => 0,
            };

            Ok(QuoteLineItem {
                id: draft.id.unwrap_or_else(QuoteLineItemId::new),
                description: draft.description,
                quantity: draft.quantity,
                sellers_price_id: draft.sellers_price_id,
                subtotal_in_cents,
                delivery_method: draft.delivery_method,
                delivery_location: draft.delivery_location,
                delivery_notes: draft.delivery_notes,
                intake_form_submission_line_item_id: draft
                    .intake_form_submission_line_item_id
                    .resolve(None),
                kind: draft.kind,
            })
        })
        .collect()
}
