//! Per-(buyer, seller) shopping carts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use business_cart_core::{AccountId, CartId, CartItemId, Money, ProductId};

/// Largest quantity one line can hold (the `INTEGER` column's maximum).
pub const MAX_LINE_QUANTITY: u32 = 2_147_483_647;

/// One line of a cart, copied verbatim into quotes and orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
}

impl CartItem {
    /// `price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price * self.quantity
    }
}

/// A line to add to a cart; the item id is minted by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub quantity: u32,
}

/// A buyer's cart with one seller.
///
/// `total_price` is derived from `items`; every store write recomputes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub buyer_id: AccountId,
    pub seller_id: AccountId,
    pub items: Vec<CartItem>,
    pub total_price: Money,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// An unsaved, empty cart for a key.
    #[must_use]
    pub fn empty(buyer_id: AccountId, seller_id: AccountId) -> Self {
        Self {
            id: CartId::generate(),
            buyer_id,
            seller_id,
            items: Vec::new(),
            total_price: Money::ZERO,
            updated_at: Utc::now(),
        }
    }

    /// `Σ(price × quantity)` over the current items.
    #[must_use]
    pub fn computed_total(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Drop zero-quantity lines and refresh `total_price`.
    pub fn recompute_total(&mut self) {
        self.items.retain(|item| item.quantity > 0);
        self.total_price = self.computed_total();
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn item(cents: i64, quantity: u32) -> CartItem {
        CartItem {
            id: CartItemId::generate(),
            product_id: ProductId::generate(),
            name: "Widget".into(),
            price: Money::from_cents(cents),
            quantity,
        }
    }

    #[test]
    fn test_recompute_ignores_caller_total() {
        let mut cart = Cart::empty(AccountId::generate(), AccountId::generate());
        cart.items = vec![item(1000, 2), item(500, 1)];
        cart.total_price = Money::from_cents(1);

        cart.recompute_total();
        assert_eq!(cart.total_price.amount(), Decimal::new(25, 0));
    }

    #[test]
    fn test_recompute_removes_zero_quantity_lines() {
        let mut cart = Cart::empty(AccountId::generate(), AccountId::generate());
        cart.items = vec![item(1000, 0), item(250, 4)];

        cart.recompute_total();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total_price, Money::from_cents(1000));
    }
}
