//! Order placement as a saga keyed by quote id.
//!
//! 1. Charge the buyer for the quote's grand total.
//! 2. Insert the order and a pending-cleanup record in one write.
//! 3. Clear the (buyer, seller) cart and delete the quote, then drop the
//!    pending record.
//!
//! Step 3 is idempotent and best-effort. A failure there leaves the pending
//! record behind for [`OrderLedger::reconcile`]; the order itself is never
//! rolled back. A quote yields at most one order: placing it again returns the
//! existing order without charging.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use business_cart_core::{
    AccountId, Claims, OrderId, PaymentMethod, QuoteId, Resource, resolve_filter,
};

use super::payment::{PaymentError, PaymentGateway};
use crate::db::{CartRepository, OrderRepository, QuoteRepository, RepositoryError};
use crate::models::{Order, PendingCleanup};

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No quote (and no order made from it) exists for the id.
    #[error("quote not found")]
    QuoteNotFound,

    /// The quote belongs to another buyer.
    #[error("quote belongs to another account")]
    NotOwner,

    /// The quote's validity window has passed.
    #[error("quote has expired")]
    QuoteExpired,

    /// The order does not exist or is not visible to the caller.
    #[error("order not found")]
    NotFound,

    /// The gateway declined the charge.
    #[error("payment declined")]
    PaymentDeclined,

    /// The gateway failed for a reason other than a decline.
    #[error("payment failed: {0}")]
    Payment(PaymentError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<PaymentError> for OrderError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Declined => Self::PaymentDeclined,
            other @ PaymentError::Unavailable(_) => Self::Payment(other),
        }
    }
}

/// Outcome of a reconciliation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub attempted: usize,
    pub completed: usize,
    pub failed: usize,
}

/// The only writer of orders, and the only component that deletes quotes or
/// clears carts after purchase.
#[derive(Clone)]
pub struct OrderLedger {
    quotes: Arc<dyn QuoteRepository>,
    carts: Arc<dyn CartRepository>,
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentGateway>,
}

impl OrderLedger {
    #[must_use]
    pub fn new(
        quotes: Arc<dyn QuoteRepository>,
        carts: Arc<dyn CartRepository>,
        orders: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            quotes,
            carts,
            orders,
            payments,
        }
    }

    /// Turn a quote into an order.
    ///
    /// # Errors
    ///
    /// - `QuoteNotFound` if neither the quote nor an order from it exists
    /// - `NotOwner` if `buyer` did not request the quote
    /// - `QuoteExpired` if the quote is past `expires_at`
    /// - `PaymentDeclined` if the charge is refused; nothing is written
    pub async fn place_order(
        &self,
        quote_id: QuoteId,
        buyer: AccountId,
        method: PaymentMethod,
        payment_token: &str,
    ) -> Result<Order, OrderError> {
        if let Some(existing) = self.existing_order(quote_id, buyer).await? {
            return Ok(existing);
        }

        let quote = self
            .quotes
            .find_by_id(quote_id)
            .await?
            .ok_or(OrderError::QuoteNotFound)?;
        if quote.buyer_id != buyer {
            return Err(OrderError::NotOwner);
        }
        let now = Utc::now();
        if quote.is_expired_at(now) {
            return Err(OrderError::QuoteExpired);
        }

        let transaction = self
            .payments
            .charge(quote.totals.grand_total, method, payment_token)
            .await?;

        let order = Order::from_quote(&quote, method, transaction, now);
        match self.orders.insert_with_cleanup(&order).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict(_)) => {
                // Lost a race with a concurrent placement of the same quote.
                tracing::warn!(
                    quote_id = %quote_id,
                    transaction = %order.transaction_id,
                    "Quote ordered concurrently; charge left unattached"
                );
                return self
                    .existing_order(quote_id, buyer)
                    .await?
                    .ok_or(OrderError::QuoteNotFound);
            }
            Err(err) => {
                tracing::error!(
                    quote_id = %quote_id,
                    transaction = %order.transaction_id,
                    error = %err,
                    "Charge captured but order insert failed"
                );
                return Err(err.into());
            }
        }

        tracing::info!(
            order_id = %order.id,
            quote_id = %quote_id,
            buyer_id = %order.buyer_id,
            seller_id = %order.seller_id,
            "Order placed"
        );
        self.cleanup_best_effort(order.cleanup()).await;
        Ok(order)
    }

    /// An order already made from `quote_id`.
    ///
    /// Cleanup is re-run only while it is still owed; once finished, the
    /// buyer's cart with this seller belongs to them again.
    async fn existing_order(
        &self,
        quote_id: QuoteId,
        buyer: AccountId,
    ) -> Result<Option<Order>, OrderError> {
        let Some(order) = self.orders.find_by_quote(quote_id).await? else {
            return Ok(None);
        };
        if order.buyer_id != buyer {
            return Err(OrderError::QuoteNotFound);
        }
        if let Some(pending) = self.orders.pending_cleanup(quote_id).await? {
            self.cleanup_best_effort(pending).await;
        }
        Ok(Some(order))
    }

    async fn cleanup_best_effort(&self, pending: PendingCleanup) {
        if let Err(err) = self.cleanup(pending).await {
            tracing::warn!(
                quote_id = %pending.quote_id,
                error = %err,
                "Order cleanup failed; left for reconciliation"
            );
        }
    }

    /// Clear the cart and delete the quote for a placed order.
    ///
    /// Safe to run any number of times. Both steps are attempted even if the
    /// first fails; the pending record is only dropped when both succeed.
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered.
    pub async fn cleanup(&self, pending: PendingCleanup) -> Result<(), RepositoryError> {
        let cleared = self.carts.clear(pending.buyer_id, pending.seller_id).await;
        let deleted = self.quotes.delete(pending.quote_id).await;

        cleared?;
        deleted?;
        self.orders.complete_cleanup(pending.quote_id).await
    }

    /// Retry cleanup for up to `limit` placed orders still owing it.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the pending records cannot be read.
    /// Individual cleanup failures are counted, not returned.
    pub async fn reconcile(&self, limit: u32) -> Result<ReconcileReport, OrderError> {
        let pending = self.orders.pending_cleanups(limit).await?;
        let mut report = ReconcileReport {
            attempted: pending.len(),
            ..ReconcileReport::default()
        };

        for item in pending {
            match self.cleanup(item).await {
                Ok(()) => report.completed += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(quote_id = %item.quote_id, error = %err, "Reconcile failed");
                }
            }
        }

        if report.attempted > 0 {
            tracing::info!(
                attempted = report.attempted,
                completed = report.completed,
                failed = report.failed,
                "Order cleanup reconciled"
            );
        }
        Ok(report)
    }

    /// Orders visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if storage fails.
    pub async fn list_orders(&self, claims: &Claims) -> Result<Vec<Order>, OrderError> {
        let predicate = resolve_filter(
            claims.role,
            claims.subject,
            &claims.associated_company_ids,
            Resource::Orders,
        );
        Ok(self.orders.list(&predicate).await?)
    }

    /// One order, if visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if absent or outside the caller's scope.
    pub async fn get_order(&self, claims: &Claims, id: OrderId) -> Result<Order, OrderError> {
        let predicate = resolve_filter(
            claims.role,
            claims.subject,
            &claims.associated_company_ids,
            Resource::Orders,
        );
        self.orders
            .find_by_id(id)
            .await?
            .filter(|o| predicate.admits_order(o.seller_id, o.buyer_id))
            .ok_or(OrderError::NotFound)
    }
}
