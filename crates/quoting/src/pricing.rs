//! Price resolution seam.
//!
//! Subtotals are computed outside the aggregate: the resolver owns the
//! price-book lookup and the duration factor for rentals. Aggregates only
//! ever see the resulting cents amount.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use dealdesk_core::{DomainError, DomainResult, PriceId, RentalWindow};

/// Resolves a price reference to a line subtotal in cents.
pub trait PricingResolver: Send + Sync {
    /// Compute `unit price * quantity`, multiplied by the billable duration
    /// when a rental window is given. Unknown price ids fail `NotFound`.
    fn resolve_subtotal(
        &self,
        price_id: PriceId,
        quantity: u32,
        rental_window: Option<&RentalWindow>,
    ) -> DomainResult<i64>;
}

impl<P> PricingResolver for Arc<P>
where
    P: PricingResolver + ?Sized,
{
    fn resolve_subtotal(
        &self,
        price_id: PriceId,
        quantity: u32,
        rental_window: Option<&RentalWindow>,
    ) -> DomainResult<i64> {
        (**self).resolve_subtotal(price_id, quantity, rental_window)
    }
}

/// In-memory price book for tests/dev. Prices are per unit, per day for
/// rentals.
#[derive(Debug, Default)]
pub struct InMemoryPriceBook {
    unit_prices: RwLock<HashMap<PriceId, i64>>,
}

impl InMemoryPriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&self, price_id: PriceId, unit_cents: i64) {
        if let Ok(mut prices) = self.unit_prices.write() {
            prices.insert(price_id, unit_cents);
        }
    }

    fn unit_price(&self, price_id: PriceId) -> Option<i64> {
        self.unit_prices
            .read()
            .ok()
            .and_then(|prices| prices.get(&price_id).copied())
    }
}

/// Partial days bill as full days; a same-day window bills one day.
fn billable_days(window: &RentalWindow) -> i64 {
    let hours = (window.end - window.start).num_hours();
    ((hours + 23) / 24).max(1)
}

impl PricingResolver for InMemoryPriceBook {
    fn resolve_subtotal(
        &self,
        price_id: PriceId,
        quantity: u32,
        rental_window: Option<&RentalWindow>,
    ) -> DomainResult<i64> {
        let unit_cents = self
            .unit_price(price_id)
            .ok_or_else(|| DomainError::not_found(format!("unknown price id {price_id}")))?;

        let duration_factor = rental_window.map(billable_days).unwrap_or(1);
        Ok(unit_cents * i64::from(quantity) * duration_factor)
    }
}
