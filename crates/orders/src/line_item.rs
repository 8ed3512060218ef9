use serde::{Deserialize, Serialize};

use dealdesk_core::{
    DomainError, Entity, OrderLineItemId, PimCategoryId, PriceId, QuoteLineItemId, RentalWindow,
};

/// Kind-specific order line data (closed sum type, `kind` discriminant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OrderLineItemKind {
    Rental {
        pim_category_id: PimCategoryId,
        rental_window: RentalWindow,
    },
    Sale {
        pim_category_id: PimCategoryId,
    },
    Service,
}

/// A line on a sales or purchase order.
///
/// `quote_revision_line_item_id` is a weak back-reference to the source quote
/// line item; delivery fields are copied verbatim from it. Rental lines carry
/// quantity 1 by construction (a rental quote line of quantity N fans out
/// into N order lines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: OrderLineItemId,
    pub description: String,
    pub quantity: u32,
    pub price_id: Option<PriceId>,
    pub quote_revision_line_item_id: QuoteLineItemId,
    pub delivery_method: Option<String>,
    pub delivery_location: Option<String>,
    pub delivery_notes: Option<String>,
    #[serde(flatten)]
    pub kind: OrderLineItemKind,
}

impl Entity for OrderLineItem {
    type Id = OrderLineItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

pub(crate) fn validate_line_items(items: &[OrderLineItem]) -> Result<(), DomainError> {
    for item in items {
        if item.quantity == 0 {
            return Err(DomainError::validation("line item quantity must be positive"));
        }
        if matches!(item.kind, OrderLineItemKind::Rental { .. }) && item.quantity != 1 {
            return Err(DomainError::validation(
                "rental order line items carry quantity 1",
            ));
        }
    }
    Ok(())
}
