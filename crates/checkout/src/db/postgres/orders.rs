//! Orders and the cleanup still owed for them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};

use business_cart_core::{
    AccountId, CartId, Money, OrderId, PaymentMethod, Predicate, QuoteId, Totals, TransactionId,
};

use super::{PgStore, ScopeColumns, push_scope};
use crate::db::{OrderRepository, RepositoryError, conflict_on_unique};
use crate::models::{CartItem, Order, PendingCleanup};

const ORDER_SCOPE: ScopeColumns = ScopeColumns {
    id: "id",
    seller: Some("seller_id"),
    buyer: Some("buyer_id"),
    customer_profile: None,
};

const SELECT_ORDER: &str = r"
    SELECT id, quote_id, cart_id, buyer_id, seller_id, items,
           subtotal, shipping_cost, tax_amount, grand_total,
           payment_method, transaction_id, created_at
    FROM orders
";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    quote_id: QuoteId,
    cart_id: CartId,
    buyer_id: AccountId,
    seller_id: AccountId,
    items: Json<Vec<CartItem>>,
    subtotal: Decimal,
    shipping_cost: Decimal,
    tax_amount: Decimal,
    grand_total: Decimal,
    payment_method: PaymentMethod,
    transaction_id: String,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            quote_id: row.quote_id,
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
            payment_method: row.payment_method,
            transaction_id: TransactionId::new(row.transaction_id),
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CleanupRow {
    quote_id: QuoteId,
    buyer_id: AccountId,
    seller_id: AccountId,
    created_at: DateTime<Utc>,
}

impl From<CleanupRow> for PendingCleanup {
    fn from(row: CleanupRow) -> Self {
        Self {
            quote_id: row.quote_id,
            buyer_id: row.buyer_id,
            seller_id: row.seller_id,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn insert_with_cleanup(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r"
            INSERT INTO orders (
                id, quote_id, cart_id, buyer_id, seller_id, items,
                subtotal, shipping_cost, tax_amount, grand_total,
                payment_method, transaction_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ",
        )
        .bind(order.id)
        .bind(order.quote_id)
        .bind(order.cart_id)
        .bind(order.buyer_id)
        .bind(order.seller_id)
        .bind(Json(&order.items))
        .bind(order.totals.subtotal.amount())
        .bind(order.totals.shipping_cost.amount())
        .bind(order.totals.tax_amount.amount())
        .bind(order.totals.grand_total.amount())
        .bind(order.payment_method)
        .bind(order.transaction_id.as_str())
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "quote already ordered"))?;

        let cleanup = order.cleanup();
        sqlx::query(
            r"
            INSERT INTO order_cleanups (quote_id, buyer_id, seller_id, created_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(cleanup.quote_id)
        .bind(cleanup.buyer_id)
        .bind(cleanup.seller_id)
        .bind(cleanup.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{SELECT_ORDER} WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Order::from))
    }

    async fn find_by_quote(&self, quote_id: QuoteId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{SELECT_ORDER} WHERE quote_id = $1"))
            .bind(quote_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Order::from))
    }

    async fn list(&self, predicate: &Predicate) -> Result<Vec<Order>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_ORDER);
        qb.push(" WHERE ");
        push_scope(&mut qb, predicate, ORDER_SCOPE);
        qb.push(" ORDER BY created_at DESC");

        let rows = qb.build_query_as::<OrderRow>().fetch_all(self.pool()).await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn pending_cleanup(
        &self,
        quote_id: QuoteId,
    ) -> Result<Option<PendingCleanup>, RepositoryError> {
        let row = sqlx::query_as::<_, CleanupRow>(
            r"
            SELECT quote_id, buyer_id, seller_id, created_at
            FROM order_cleanups
            WHERE quote_id = $1
            ",
        )
        .bind(quote_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(PendingCleanup::from))
    }

    async fn pending_cleanups(&self, limit: u32) -> Result<Vec<PendingCleanup>, RepositoryError> {
        let rows = sqlx::query_as::<_, CleanupRow>(
            r"
            SELECT quote_id, buyer_id, seller_id, created_at
            FROM order_cleanups
            ORDER BY created_at
            LIMIT $1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(PendingCleanup::from).collect())
    }

    async fn complete_cleanup(&self, quote_id: QuoteId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM order_cleanups WHERE quote_id = $1")
            .bind(quote_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
