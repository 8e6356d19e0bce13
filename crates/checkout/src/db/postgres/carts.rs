//! Carts and their line items.
//!
//! A cart is a `carts` row keyed uniquely by `(buyer_id, seller_id)` plus its
//! `cart_items`, each unique by `(cart_id, product_id)`. Every write runs in a
//! transaction that ends by recomputing `total_price` from the items in SQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;

use business_cart_core::{AccountId, CartId, CartItemId, Money, ProductId};

use super::{PgStore, quantity_from_db, quantity_to_db};
use crate::db::{CartRepository, RepositoryError, out_of_range_on_overflow};
use crate::models::{Cart, CartItem, NewCartItem};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    buyer_id: AccountId,
    seller_id: AccountId,
    total_price: Decimal,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: CartItemId,
    product_id: ProductId,
    name: String,
    price: Decimal,
    quantity: i32,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            name: row.name,
            price: Money::new(row.price),
            quantity: quantity_from_db(row.quantity)?,
        })
    }
}

/// Insert the cart row if missing and return its id, locking it for the
/// rest of the transaction.
async fn upsert_cart_row(
    conn: &mut PgConnection,
    buyer: AccountId,
    seller: AccountId,
) -> Result<CartId, RepositoryError> {
    let id = sqlx::query_scalar::<_, CartId>(
        r"
        INSERT INTO carts (id, buyer_id, seller_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (buyer_id, seller_id) DO UPDATE SET updated_at = now()
        RETURNING id
        ",
    )
    .bind(CartId::generate())
    .bind(buyer)
    .bind(seller)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

/// Lock an existing cart row.
async fn lock_cart_row(
    conn: &mut PgConnection,
    buyer: AccountId,
    seller: AccountId,
) -> Result<CartId, RepositoryError> {
    sqlx::query_scalar::<_, CartId>(
        "SELECT id FROM carts WHERE buyer_id = $1 AND seller_id = $2 FOR UPDATE",
    )
    .bind(buyer)
    .bind(seller)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Recompute the stored total and read the cart back.
async fn finish(conn: &mut PgConnection, cart_id: CartId) -> Result<Cart, RepositoryError> {
    sqlx::query(
        r"
        UPDATE carts
        SET total_price = COALESCE(
                (SELECT SUM(price * quantity) FROM cart_items WHERE cart_id = $1), 0),
            updated_at = now()
        WHERE id = $1
        ",
    )
    .bind(cart_id)
    .execute(&mut *conn)
    .await?;

    let row = sqlx::query_as::<_, CartRow>(
        "SELECT id, buyer_id, seller_id, total_price, updated_at FROM carts WHERE id = $1",
    )
    .bind(cart_id)
    .fetch_one(&mut *conn)
    .await?;

    load_items(conn, row).await
}

async fn load_items(conn: &mut PgConnection, row: CartRow) -> Result<Cart, RepositoryError> {
    let items = sqlx::query_as::<_, CartItemRow>(
        r"
        SELECT id, product_id, name, price, quantity
        FROM cart_items
        WHERE cart_id = $1
        ORDER BY added_at, id
        ",
    )
    .bind(row.id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .map(CartItem::try_from)
    .collect::<Result<Vec<_>, _>>()?;

    Ok(Cart {
        id: row.id,
        buyer_id: row.buyer_id,
        seller_id: row.seller_id,
        items,
        total_price: Money::new(row.total_price),
        updated_at: row.updated_at,
    })
}

/// Add to a product's line, or insert the line.
async fn merge_line(
    conn: &mut PgConnection,
    cart_id: CartId,
    item_id: CartItemId,
    item: &NewCartItem,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO cart_items (id, cart_id, product_id, name, price, quantity)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (cart_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
        ",
    )
    .bind(item_id)
    .bind(cart_id)
    .bind(item.product_id)
    .bind(&item.name)
    .bind(item.price.amount())
    .bind(quantity_to_db(item.quantity)?)
    .execute(conn)
    .await
    .map_err(|e| out_of_range_on_overflow(e, "cart line quantity"))?;
    Ok(())
}

#[async_trait]
impl CartRepository for PgStore {
    async fn find(
        &self,
        buyer: AccountId,
        seller: AccountId,
    ) -> Result<Option<Cart>, RepositoryError> {
        let mut conn = self.pool().acquire().await?;
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, buyer_id, seller_id, total_price, updated_at
            FROM carts
            WHERE buyer_id = $1 AND seller_id = $2
            ",
        )
        .bind(buyer)
        .bind(seller)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => Ok(Some(load_items(&mut conn, row).await?)),
            None => Ok(None),
        }
    }

    async fn add_item(
        &self,
        buyer: AccountId,
        seller: AccountId,
        item: NewCartItem,
    ) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool().begin().await?;
        let cart_id = upsert_cart_row(&mut tx, buyer, seller).await?;
        merge_line(&mut tx, cart_id, CartItemId::generate(), &item).await?;
        let cart = finish(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn set_item_quantity(
        &self,
        buyer: AccountId,
        seller: AccountId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool().begin().await?;
        let cart_id = lock_cart_row(&mut tx, buyer, seller).await?;

        let updated =
            sqlx::query("UPDATE cart_items SET quantity = $1 WHERE id = $2 AND cart_id = $3")
                .bind(quantity_to_db(quantity)?)
                .bind(item_id)
                .bind(cart_id)
                .execute(&mut *tx)
                .await?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let cart = finish(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn remove_item(
        &self,
        buyer: AccountId,
        seller: AccountId,
        item_id: CartItemId,
    ) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool().begin().await?;
        let cart_id = lock_cart_row(&mut tx, buyer, seller).await?;

        let deleted = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
            .bind(item_id)
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let cart = finish(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn clear(&self, buyer: AccountId, seller: AccountId) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool().begin().await?;
        let cart_id = upsert_cart_row(&mut tx, buyer, seller).await?;
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;
        let cart = finish(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn save(&self, cart: &Cart) -> Result<Cart, RepositoryError> {
        let mut cart = cart.clone();
        cart.recompute_total();

        let mut tx = self.pool().begin().await?;
        let cart_id = upsert_cart_row(&mut tx, cart.buyer_id, cart.seller_id).await?;
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;
        for line in cart.items {
            let item = NewCartItem {
                product_id: line.product_id,
                name: line.name,
                price: line.price,
                quantity: line.quantity,
            };
            merge_line(&mut tx, cart_id, line.id, &item).await?;
        }
        let saved = finish(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(saved)
    }
}
