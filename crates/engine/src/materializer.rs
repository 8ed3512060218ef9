//! Order materialization: accepted quote revision in, order line items out.
//!
//! Pure expansion logic; the acceptance orchestrator turns the produced
//! lines into `CreateSalesOrder`/`CreatePurchaseOrder` commands. Called once
//! per order side, so the seller's and the buyer's documents carry
//! independent line item ids while tracing back to the same quote line
//! items.

use dealdesk_core::OrderLineItemId;
use dealdesk_orders::{OrderLineItem, OrderLineItemKind};
use dealdesk_quoting::{QuoteLineItemKind, QuoteRevision};

/// Expand a revision's line items into order line items.
///
/// A rental quote line of quantity N fans out into N order lines of
/// quantity 1, one per physical unit, all referencing the source quote line
/// item and sharing its price reference. Sale and service lines map 1:1,
/// preserving quantity. Delivery fields copy verbatim.
pub fn expand_revision_line_items(revision: &QuoteRevision) -> Vec<OrderLineItem> {
    let mut lines = Vec::new();

    for item in &revision.line_items {
        match &item.kind {
            QuoteLineItemKind::Rental {
                pim_category_id,
                rental_window,
            } => {
                for _ in 0..item.quantity {
                    lines.push(OrderLineItem {
                        id: OrderLineItemId::new(),
                        description: item.description.clone(),
                        quantity: 1,
                        price_id: item.sellers_price_id,
                        quote_revision_line_item_id: item.id,
                        delivery_method: item.delivery_method.clone(),
                        delivery_location: item.delivery_location.clone(),
                        delivery_notes: item.delivery_notes.clone(),
                        kind: OrderLineItemKind::Rental {
                            pim_category_id: *pim_category_id,
                            rental_window: *rental_window,
                        },
                    });
                }
            }
            QuoteLineItemKind::Sale { pim_category_id } => {
                lines.push(OrderLineItem {
                    id: OrderLineItemId::new(),
                    description: item.description.clone(),
                    quantity: item.quantity,
                    price_id: item.sellers_price_id,
                    quote_revision_line_item_id: item.id,
                    delivery_method: item.delivery_method.clone(),
                    delivery_location: item.delivery_location.clone(),
                    delivery_notes: item.delivery_notes.clone(),
                    kind: OrderLineItemKind::Sale {
                        pim_category_id: *pim_category_id,
                    },
                });
            }
            QuoteLineItemKind::Service => {
                lines.push(OrderLineItem {
                    id: OrderLineItemId::new(),
                    description: item.description.clone(),
                    quantity: item.quantity,
                    price_id: item.sellers_price_id,
                    quote_revision_line_item_id: item.id,
                    delivery_method: item.delivery_method.clone(),
                    delivery_location: item.delivery_location.clone(),
                    delivery_notes: item.delivery_notes.clone(),
                    kind: OrderLineItemKind::Service,
                });
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use dealdesk_core::{PimCategoryId, PriceId, QuoteLineItemId, RentalWindow, RevisionId};
    use dealdesk_quoting::{QuoteLineItem, RevisionStatus};
    use std::collections::HashSet;

    fn rental_item(quantity: u32) -> QuoteLineItem {
        let start = Utc::now();
        QuoteLineItem {
            id: QuoteLineItemId::new(),
            description: "Scissor lift".to_string(),
            quantity,
            sellers_price_id: Some(PriceId::new()),
            subtotal_in_cents: 42_000,
            delivery_method: Some("haulage".to_string()),
            delivery_location: Some("Site B".to_string()),
            delivery_notes: None,
            intake_form_submission_line_item_id: None,
            kind: QuoteLineItemKind::Rental {
                pim_category_id: PimCategoryId::new(),
                rental_window: RentalWindow::new(start, start + Duration::days(7)),
            },
        }
    }

    fn sale_item(quantity: u32) -> QuoteLineItem {
        QuoteLineItem {
            id: QuoteLineItemId::new(),
            description: "Safety harness".to_string(),
            quantity,
            sellers_price_id: Some(PriceId::new()),
            subtotal_in_cents: 9_000,
            delivery_method: None,
            delivery_location: None,
            delivery_notes: None,
            intake_form_submission_line_item_id: None,
            kind: QuoteLineItemKind::Sale {
                pim_category_id: PimCategoryId::new(),
            },
        }
    }

    fn revision(line_items: Vec<QuoteLineItem>) -> QuoteRevision {
        QuoteRevision {
            id: RevisionId::new(),
            revision_number: 1,
            status: RevisionStatus::Sent,
            valid_until: None,
            line_items,
        }
    }

    #[test]
    fn rental_line_fans_out_into_quantity_one_lines() {
        let item = rental_item(4);
        let source_id = item.id;
        let price_id = item.sellers_price_id;
        let revision = revision(vec![item]);

        let lines = expand_revision_line_items(&revision);

        assert_eq!(lines.len(), 4);
        for line in &lines {
            assert_eq!(line.quantity, 1);
            assert_eq!(line.quote_revision_line_item_id, source_id);
            assert_eq!(line.price_id, price_id);
            assert_eq!(line.delivery_method.as_deref(), Some("haulage"));
            assert!(matches!(line.kind, OrderLineItemKind::Rental { .. }));
        }

        let distinct_ids: HashSet<_> = lines.iter().map(|l| l.id).collect();
        assert_eq!(distinct_ids.len(), 4);
    }

    #[test]
    fn sale_line_maps_one_to_one_preserving_quantity() {
        let item = sale_item(6);
        let source_id = item.id;
        let revision = revision(vec![item]);

        let lines = expand_revision_line_items(&revision);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 6);
        assert_eq!(lines[0].quote_revision_line_item_id, source_id);
        assert!(matches!(lines[0].kind, OrderLineItemKind::Sale { .. }));
    }

    #[test]
    fn service_line_keeps_quantity_and_kind() {
        let item = QuoteLineItem {
            id: QuoteLineItemId::new(),
            description: "Operator training".to_string(),
            quantity: 2,
            sellers_price_id: None,
            subtotal_in_cents: 0,
            delivery_method: None,
            delivery_location: None,
            delivery_notes: None,
            intake_form_submission_line_item_id: None,
            kind: QuoteLineItemKind::Service,
        };
        let revision = revision(vec![item]);

        let lines = expand_revision_line_items(&revision);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].price_id, None);
        assert!(matches!(lines[0].kind, OrderLineItemKind::Service));
    }

    #[test]
    fn each_expansion_assigns_fresh_line_item_ids() {
        let revision = revision(vec![rental_item(2), sale_item(1)]);

        let seller_side = expand_revision_line_items(&revision);
        let buyer_side = expand_revision_line_items(&revision);

        assert_eq!(seller_side.len(), buyer_side.len());
        let seller_ids: HashSet<_> = seller_side.iter().map(|l| l.id).collect();
        let buyer_ids: HashSet<_> = buyer_side.iter().map(|l| l.id).collect();
        assert!(seller_ids.is_disjoint(&buyer_ids));

        // Traceability references line up even though record ids differ.
        let seller_refs: Vec<_> = seller_side
            .iter()
            .map(|l| l.quote_revision_line_item_id)
            .collect();
        let buyer_refs: Vec<_> = buyer_side
            .iter()
            .map(|l| l.quote_revision_line_item_id)
            .collect();
        assert_eq!(seller_refs, buyer_refs);
    }

    #[test]
    fn mixed_revision_expands_in_order() {
        let revision = revision(vec![rental_item(3), sale_item(2)]);

        let lines = expand_revision_line_items(&revision);

        assert_eq!(lines.len(), 4);
        assert!(lines[..3]
            .iter()
            .all(|l| matches!(l.kind, OrderLineItemKind::Rental { .. })));
        assert!(matches!(lines[3].kind, OrderLineItemKind::Sale { .. }));
    }
}
