//! Quote creation and lookup.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use business_cart_core::pricing::quote_expiry;
use business_cart_core::{AccountId, Claims, QuoteId, Totals};

use crate::db::{CartRepository, QuoteRepository, RepositoryError};
use crate::models::{Cart, Quote};

/// Errors from quote operations.
#[derive(Debug, Error)]
pub enum QuoteError {
    /// The cart has no lines to price.
    #[error("cart is empty")]
    EmptyCart,

    /// No cart exists for the (buyer, seller) key.
    #[error("cart not found")]
    CartNotFound,

    /// No quote exists with the id.
    #[error("quote not found")]
    NotFound,

    /// The quote belongs to another buyer.
    #[error("quote belongs to another account")]
    NotOwner,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Snapshots carts into priced quotes.
#[derive(Clone)]
pub struct QuoteEngine {
    carts: Arc<dyn CartRepository>,
    quotes: Arc<dyn QuoteRepository>,
}

impl QuoteEngine {
    #[must_use]
    pub fn new(carts: Arc<dyn CartRepository>, quotes: Arc<dyn QuoteRepository>) -> Self {
        Self { carts, quotes }
    }

    /// Price and persist a snapshot of `cart`.
    ///
    /// The cart itself is left untouched, so an abandoned quote loses nothing.
    ///
    /// # Errors
    ///
    /// Returns `QuoteError::EmptyCart` without persisting anything if the cart
    /// has no lines.
    pub async fn create_quote(&self, cart: &Cart) -> Result<Quote, QuoteError> {
        if cart.is_empty() {
            return Err(QuoteError::EmptyCart);
        }

        let created_at = Utc::now();
        let quote = Quote {
            id: QuoteId::generate(),
            cart_id: cart.id,
            buyer_id: cart.buyer_id,
            seller_id: cart.seller_id,
            items: cart.items.clone(),
            totals: Totals::for_subtotal(cart.computed_total()),
            created_at,
            expires_at: quote_expiry(created_at),
        };
        self.quotes.insert(&quote).await?;

        tracing::info!(
            quote_id = %quote.id,
            buyer_id = %quote.buyer_id,
            seller_id = %quote.seller_id,
            grand_total = %quote.totals.grand_total,
            "Quote created"
        );
        Ok(quote)
    }

    /// Quote the stored cart for (buyer, seller).
    ///
    /// # Errors
    ///
    /// Returns `QuoteError::CartNotFound` if no cart was ever saved for the
    /// key, `QuoteError::EmptyCart` if it has no lines.
    pub async fn quote_cart(
        &self,
        buyer: AccountId,
        seller: AccountId,
    ) -> Result<Quote, QuoteError> {
        let cart = self
            .carts
            .find(buyer, seller)
            .await?
            .ok_or(QuoteError::CartNotFound)?;
        self.create_quote(&cart).await
    }

    /// Load a quote. Expiry is not checked here.
    ///
    /// # Errors
    ///
    /// Returns `QuoteError::NotFound` if absent.
    pub async fn get_quote(&self, id: QuoteId) -> Result<Quote, QuoteError> {
        self.quotes
            .find_by_id(id)
            .await?
            .ok_or(QuoteError::NotFound)
    }

    /// Load a quote on behalf of its buyer.
    ///
    /// # Errors
    ///
    /// Returns `QuoteError::NotOwner` if the caller is not the quote's buyer.
    pub async fn get_owned(&self, id: QuoteId, claims: &Claims) -> Result<Quote, QuoteError> {
        let quote = self.get_quote(id).await?;
        if quote.buyer_id != claims.subject {
            return Err(QuoteError::NotOwner);
        }
        Ok(quote)
    }
}
