//! Finalized purchases and their pending cleanup.

use chrono::{DateTime, Utc};
use serde::Serialize;

use business_cart_core::{
    AccountId, CartId, OrderId, PaymentMethod, QuoteId, Totals, TransactionId,
};

use super::cart::CartItem;
use super::quote::Quote;

/// An immutable purchase record made from exactly one quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub quote_id: QuoteId,
    pub cart_id: CartId,
    pub buyer_id: AccountId,
    pub seller_id: AccountId,
    pub items: Vec<CartItem>,
    #[serde(flatten)]
    pub totals: Totals,
    pub payment_method: PaymentMethod,
    pub transaction_id: TransactionId,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Copy a quote into an order paid by `transaction_id`.
    #[must_use]
    pub fn from_quote(
        quote: &Quote,
        payment_method: PaymentMethod,
        transaction_id: TransactionId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::generate(),
            quote_id: quote.id,
            cart_id: quote.cart_id,
            buyer_id: quote.buyer_id,
            seller_id: quote.seller_id,
            items: quote.items.clone(),
            totals: quote.totals,
            payment_method,
            transaction_id,
            created_at,
        }
    }

    /// The cleanup record written together with this order.
    #[must_use]
    pub const fn cleanup(&self) -> PendingCleanup {
        PendingCleanup {
            quote_id: self.quote_id,
            buyer_id: self.buyer_id,
            seller_id: self.seller_id,
            created_at: self.created_at,
        }
    }
}

/// Cart and quote retirement still owed for a placed order.
///
/// Keyed by quote id; deleted once the cart is cleared and the quote removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCleanup {
    pub quote_id: QuoteId,
    pub buyer_id: AccountId,
    pub seller_id: AccountId,
    pub created_at: DateTime<Utc>,
}
