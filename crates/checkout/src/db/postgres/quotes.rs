//! Quotes. Line items are stored as a JSON snapshot.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;

use business_cart_core::{AccountId, CartId, Money, QuoteId, Totals};

use super::PgStore;
use crate::db::{QuoteRepository, RepositoryError, conflict_on_unique};
use crate::models::{CartItem, Quote};

#[derive(sqlx::FromRow)]
struct QuoteRow {
    id: QuoteId,
    cart_id: CartId,
    buyer_id: AccountId,
    seller_id: AccountId,
    items: Json<Vec<CartItem>>,
    subtotal: Decimal,
    shipping_cost: Decimal,
    tax_amount: Decimal,
    grand_total: Decimal,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<QuoteRow> for Quote {
    fn from(row: QuoteRow) -> Self {
        Self {
            id: row.id,
            cart_id: row.cart_id,
            buyer_id: row.buyer_id,
            seller_id: row.seller_id,
            items: row.items.0,
            totals: Totals {
                subtotal: Money::new(row.subtotal),
                shipping_cost: Money::new(row.shipping_cost),
                tax_amount: Money::new(row.tax_amount),
                grand_total: Money::new(row.grand_total),
            },
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

#[async_trait]
impl QuoteRepository for PgStore {
    async fn insert(&self, quote: &Quote) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO quotes (
                id, cart_id, buyer_id, seller_id, items,
                subtotal, shipping_cost, tax_amount, grand_total,
                created_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(quote.id)
        .bind(quote.cart_id)
        .bind(quote.buyer_id)
        .bind(quote.seller_id)
        .bind(Json(&quote.items))
        .bind(quote.totals.subtotal.amount())
        .bind(quote.totals.shipping_cost.amount())
        .bind(quote.totals.tax_amount.amount())
        .bind(quote.totals.grand_total.amount())
        .bind(quote.created_at)
        .bind(quote.expires_at)
        .execute(self.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "quote already exists"))?;
        Ok(())
    }

    async fn find_by_id(&self, id: QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let row = sqlx::query_as::<_, QuoteRow>(
            r"
            SELECT id, cart_id, buyer_id, seller_id, items,
                   subtotal, shipping_cost, tax_amount, grand_total,
                   created_at, expires_at
            FROM quotes
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(Quote::from))
    }

    async fn delete(&self, id: QuoteId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM quotes WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
