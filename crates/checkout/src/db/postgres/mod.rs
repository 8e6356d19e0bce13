//! `PostgreSQL` implementation of the repository traits.
//!
//! Queries are built at runtime (`query_as::<_, Row>`) so the crate compiles
//! without a live database. Visibility predicates are rendered into `WHERE`
//! clauses with [`sqlx::QueryBuilder`].

mod accounts;
mod carts;
mod codes;
mod orders;
mod products;
mod quotes;
mod tokens;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use business_cart_core::{AccountId, Predicate};

use super::{RepositoryError, StoreHealth};

/// Repository implementation over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Columns a predicate may constrain.
#[derive(Clone, Copy)]
struct ScopeColumns {
    id: &'static str,
    seller: Option<&'static str>,
    buyer: Option<&'static str>,
    customer_profile: Option<&'static str>,
}

/// Append the SQL condition for `predicate` to `qb`.
///
/// A predicate that does not apply to the row kind renders as `FALSE`.
fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate, columns: ScopeColumns) {
    match predicate {
        Predicate::MatchAll => {
            qb.push("TRUE");
        }
        Predicate::AccountIs(id) => {
            qb.push(columns.id).push(" = ").push_bind(*id);
        }
        Predicate::AccountOrItsCustomers(company) => match columns.customer_profile {
            Some(profile) => {
                qb.push("(")
                    .push(columns.id)
                    .push(" = ")
                    .push_bind(*company)
                    .push(" OR ")
                    .push(profile)
                    .push(" @> ")
                    .push_bind(customer_link(*company))
                    .push(")");
            }
            None => {
                qb.push("FALSE");
            }
        },
        Predicate::SellerIs(id) => match columns.seller {
            Some(seller) => {
                qb.push(seller).push(" = ").push_bind(*id);
            }
            None => {
                qb.push("FALSE");
            }
        },
        Predicate::SellerIn(ids) => match columns.seller {
            Some(seller) => {
                let ids: Vec<Uuid> = ids.iter().map(AccountId::as_uuid).collect();
                qb.push(seller).push(" = ANY(").push_bind(ids).push(")");
            }
            None => {
                qb.push("FALSE");
            }
        },
        Predicate::BuyerIs(id) => match columns.buyer {
            Some(buyer) => {
                qb.push(buyer).push(" = ").push_bind(*id);
            }
            None => {
                qb.push("FALSE");
            }
        },
    }
}

/// JSONB containment pattern matching a customer profile linked to `company`.
fn customer_link(company: AccountId) -> sqlx::types::Json<serde_json::Value> {
    sqlx::types::Json(serde_json::json!({
        "kind": "customer",
        "customerCodes": [{ "codeId": company }],
    }))
}

/// Convert a stored quantity back to the domain type.
fn quantity_from_db(quantity: i32) -> Result<u32, RepositoryError> {
    u32::try_from(quantity)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative quantity {quantity}")))
}

/// Convert a domain quantity for storage.
fn quantity_to_db(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::OutOfRange(format!("quantity {quantity} is too large")))
}
