//! Catalog listings.

use chrono::{DateTime, Utc};
use serde::Serialize;

use business_cart_core::{AccountId, Money, ProductId};

/// A product offered by a seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub seller_id: AccountId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub created_at: DateTime<Utc>,
}

/// Input for listing a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub seller_id: AccountId,
    pub name: String,
    pub description: String,
    pub price: Money,
}
