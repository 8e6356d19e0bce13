//! Storage for the checkout service.
//!
//! # Collections
//!
//! - `accounts` - Registered accounts with a role-specific JSON profile
//! - `codes` / `code_values` - Onboarding code documents and their lookup values
//! - `refresh_tokens` - Issued refresh tokens (deleted on use or logout)
//! - `blacklisted_tokens` - Revoked access tokens, kept until their expiry
//! - `products` - Catalog listings
//! - `carts` / `cart_items` - One cart per (buyer, seller)
//! - `quotes` - Priced cart snapshots
//! - `orders` / `order_cleanups` - Placed orders and cleanup still owed for them
//!
//! Every collection sits behind a repository trait. [`PgStore`] and
//! [`MemoryStore`] implement all of them; services only ever see
//! [`Repositories`].
//!
//! # Migrations
//!
//! Migrations are stored in `crates/checkout/migrations/` and run via:
//! ```bash
//! cargo run -p business-cart-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use uuid::Uuid;

use business_cart_core::{
    AccountId, CartItemId, CodeId, Email, OrderId, Predicate, ProductId, QuoteId,
};

use crate::models::{
    Account, Cart, Code, NewAccount, NewCartItem, NewCode, NewProduct, Order, PendingCleanup,
    Product, Quote, RefreshTokenRecord,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A conditional write found the row no longer in the expected state.
    #[error("stale write: {0}")]
    Stale(String),

    /// A value does not fit the column it is written to.
    #[error("out of range: {0}")]
    OutOfRange(String),
}

/// Map a unique violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(err)
}

/// Map a numeric overflow (SQLSTATE 22003) to `OutOfRange`, anything else to
/// `Database`.
pub(crate) fn out_of_range_on_overflow(err: sqlx::Error, what: &str) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("22003") => {
            RepositoryError::OutOfRange(what.to_owned())
        }
        _ => RepositoryError::Database(err),
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Accounts.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert an account, first claiming the code `claim` if given.
    ///
    /// Both writes succeed or neither does.
    ///
    /// # Errors
    ///
    /// `Stale` if the code is already claimed or missing, `Conflict` if the
    /// email or id is taken.
    async fn create(
        &self,
        account: NewAccount,
        claim: Option<CodeId>,
    ) -> Result<Account, RepositoryError>;

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError>;

    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError>;

    /// Accounts admitted by `predicate`, newest first.
    async fn list(&self, predicate: &Predicate) -> Result<Vec<Account>, RepositoryError>;
}

/// Onboarding codes.
#[async_trait]
pub trait CodeRepository: Send + Sync {
    /// Issue a code document.
    ///
    /// # Errors
    ///
    /// `Conflict` if any value is already used by any code column.
    async fn create(&self, code: NewCode) -> Result<Code, RepositoryError>;

    /// Find the document carrying `value` in any of its code columns.
    async fn find_by_value(&self, value: &str) -> Result<Option<Code>, RepositoryError>;
}

/// Refresh-token records and the access-token blacklist.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn store_refresh(&self, record: RefreshTokenRecord) -> Result<(), RepositoryError>;

    /// Delete and return a refresh record in one step.
    ///
    /// Two concurrent callers presenting the same token cannot both get it.
    async fn take_refresh(
        &self,
        token_id: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, RepositoryError>;

    async fn blacklist(
        &self,
        token_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    async fn is_blacklisted(&self, token_id: Uuid) -> Result<bool, RepositoryError>;

    /// Remove refresh and blacklist rows that expired before `now`.
    ///
    /// Returns the number of rows removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

/// Catalog listings.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Products admitted by `predicate`, newest first.
    async fn list(&self, predicate: &Predicate) -> Result<Vec<Product>, RepositoryError>;

    /// Returns whether a row was deleted.
    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError>;
}

/// Carts keyed by (buyer, seller).
///
/// Every write returns the cart as stored, with `total_price` recomputed from
/// its items.
#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn find(
        &self,
        buyer: AccountId,
        seller: AccountId,
    ) -> Result<Option<Cart>, RepositoryError>;

    /// Add `item.quantity` to the line for `item.product_id`, creating the cart
    /// and the line as needed.
    ///
    /// A single atomic write: concurrent adds of the same product all count.
    ///
    /// # Errors
    ///
    /// `OutOfRange` if the line would exceed `MAX_LINE_QUANTITY`; nothing is
    /// written.
    async fn add_item(
        &self,
        buyer: AccountId,
        seller: AccountId,
        item: NewCartItem,
    ) -> Result<Cart, RepositoryError>;

    /// Replace a line's quantity. `quantity` is positive.
    ///
    /// # Errors
    ///
    /// `NotFound` if the cart or the line does not exist, `OutOfRange` above
    /// `MAX_LINE_QUANTITY`.
    async fn set_item_quantity(
        &self,
        buyer: AccountId,
        seller: AccountId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<Cart, RepositoryError>;

    /// # Errors
    ///
    /// `NotFound` if the cart or the line does not exist.
    async fn remove_item(
        &self,
        buyer: AccountId,
        seller: AccountId,
        item_id: CartItemId,
    ) -> Result<Cart, RepositoryError>;

    /// Empty the cart, creating it if it has never been saved.
    async fn clear(&self, buyer: AccountId, seller: AccountId) -> Result<Cart, RepositoryError>;

    /// Upsert a whole cart by (buyer, seller); the stored total is recomputed.
    async fn save(&self, cart: &Cart) -> Result<Cart, RepositoryError>;
}

/// Quotes.
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn insert(&self, quote: &Quote) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: QuoteId) -> Result<Option<Quote>, RepositoryError>;

    /// Returns whether a row was deleted.
    async fn delete(&self, id: QuoteId) -> Result<bool, RepositoryError>;
}

/// Orders and their outstanding cleanup.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert an order together with its pending cleanup record.
    ///
    /// # Errors
    ///
    /// `Conflict` if the quote already has an order.
    async fn insert_with_cleanup(&self, order: &Order) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    async fn find_by_quote(&self, quote_id: QuoteId) -> Result<Option<Order>, RepositoryError>;

    /// Orders admitted by `predicate`, newest first.
    async fn list(&self, predicate: &Predicate) -> Result<Vec<Order>, RepositoryError>;

    /// The cleanup still owed for `quote_id`, if any.
    async fn pending_cleanup(
        &self,
        quote_id: QuoteId,
    ) -> Result<Option<PendingCleanup>, RepositoryError>;

    /// Oldest outstanding cleanups first.
    async fn pending_cleanups(&self, limit: u32) -> Result<Vec<PendingCleanup>, RepositoryError>;

    /// Idempotent.
    async fn complete_cleanup(&self, quote_id: QuoteId) -> Result<(), RepositoryError>;
}

/// Storage liveness.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Every repository the service needs, as trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub accounts: Arc<dyn AccountRepository>,
    pub codes: Arc<dyn CodeRepository>,
    pub tokens: Arc<dyn TokenRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub quotes: Arc<dyn QuoteRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub health: Arc<dyn StoreHealth>,
}

impl Repositories {
    /// Repositories backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)))
    }

    /// Repositories backed by a fresh, empty in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::default()))
    }

    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: AccountRepository
            + CodeRepository
            + TokenRepository
            + ProductRepository
            + CartRepository
            + QuoteRepository
            + OrderRepository
            + StoreHealth
            + 'static,
    {
        Self {
            accounts: store.clone(),
            codes: store.clone(),
            tokens: store.clone(),
            products: store.clone(),
            carts: store.clone(),
            quotes: store.clone(),
            orders: store.clone(),
            health: store,
        }
    }
}
