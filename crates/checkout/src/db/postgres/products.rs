//! Catalog listings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};

use business_cart_core::{AccountId, Money, Predicate, ProductId};

use super::{PgStore, ScopeColumns, push_scope};
use crate::db::{ProductRepository, RepositoryError};
use crate::models::{NewProduct, Product};

const PRODUCT_SCOPE: ScopeColumns = ScopeColumns {
    id: "id",
    seller: Some("seller_id"),
    buyer: None,
    customer_profile: None,
};

const SELECT_PRODUCT: &str = r"
    SELECT id, seller_id, name, description, price, created_at
    FROM products
";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    seller_id: AccountId,
    name: String,
    description: String,
    price: Decimal,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            seller_id: row.seller_id,
            name: row.name,
            description: row.description,
            price: Money::new(row.price),
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO products (id, seller_id, name, description, price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, seller_id, name, description, price, created_at
            ",
        )
        .bind(ProductId::generate())
        .bind(product.seller_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .fetch_one(self.pool())
        .await?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{SELECT_PRODUCT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Product::from))
    }

    async fn list(&self, predicate: &Predicate) -> Result<Vec<Product>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_PRODUCT);
        qb.push(" WHERE ");
        push_scope(&mut qb, predicate, PRODUCT_SCOPE);
        qb.push(" ORDER BY created_at DESC");

        let rows = qb.build_query_as::<ProductRow>().fetch_all(self.pool()).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
