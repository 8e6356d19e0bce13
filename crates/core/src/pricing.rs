//! Quote pricing.
//!
//! Flat-rate placeholders: 8.25% tax on the subtotal and a fixed $10.00
//! shipping charge. Amounts are exact decimals and are not rounded; a
//! subtotal of $25.00 yields $2.0625 tax.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Money;

/// Sales tax applied to the subtotal (8.25%).
pub const TAX_RATE: Decimal = Decimal::from_parts(825, 0, 0, false, 4);

/// Flat shipping charge per quote.
pub const FLAT_SHIPPING: Money = Money::new(Decimal::from_parts(1000, 0, 0, false, 2));

/// How long a quote stays valid after creation.
pub const QUOTE_TTL_HOURS: i64 = 24;

/// Computed totals shared by quotes and the orders made from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub tax_amount: Money,
    pub grand_total: Money,
}

impl Totals {
    /// Price a subtotal.
    #[must_use]
    pub fn for_subtotal(subtotal: Money) -> Self {
        let tax_amount = subtotal.scale(TAX_RATE);
        let shipping_cost = FLAT_SHIPPING;
        Self {
            subtotal,
            shipping_cost,
            tax_amount,
            grand_total: subtotal + tax_amount + shipping_cost,
        }
    }
}

/// Expiry of a quote created at `created_at`.
#[must_use]
pub fn quote_expiry(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::hours(QUOTE_TTL_HOURS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_constant() {
        assert_eq!(TAX_RATE, Decimal::new(825, 4));
    }

    #[test]
    fn test_flat_shipping_constant() {
        assert_eq!(FLAT_SHIPPING, Money::from_cents(1000));
        assert_eq!(FLAT_SHIPPING.amount().to_string(), "10.00");
    }

    #[test]
    fn test_reference_cart_totals() {
        // [{price: 10, qty: 2}, {price: 5, qty: 1}]
        let subtotal = Money::from_cents(1000) * 2 + Money::from_cents(500);
        let totals = Totals::for_subtotal(subtotal);

        assert_eq!(totals.subtotal.amount(), Decimal::new(25, 0));
        assert_eq!(totals.tax_amount.amount(), Decimal::new(20_625, 4));
        assert_eq!(totals.shipping_cost.amount(), Decimal::new(10, 0));
        assert_eq!(totals.grand_total.amount(), Decimal::new(370_625, 4));
    }

    #[test]
    fn test_expiry_is_exactly_one_day() {
        let now = Utc::now();
        assert_eq!(quote_expiry(now) - now, Duration::hours(24));
    }
}
