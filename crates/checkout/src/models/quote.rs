//! Immutable priced snapshots of carts.

use chrono::{DateTime, Utc};
use serde::Serialize;

use business_cart_core::{AccountId, CartId, QuoteId, Totals};

use super::cart::CartItem;

/// A time-boxed, priced copy of a cart.
///
/// Never mutated after creation. `cart_id` records which cart was priced; it is
/// not a live link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: QuoteId,
    pub cart_id: CartId,
    pub buyer_id: AccountId,
    pub seller_id: AccountId,
    pub items: Vec<CartItem>,
    #[serde(flatten)]
    pub totals: Totals,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Quote {
    /// Whether the quote can no longer be ordered at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
