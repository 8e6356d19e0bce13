//! Maintenance sweeps.
//!
//! # Usage
//!
//! ```bash
//! # Finish cart/quote cleanup for placed orders
//! bc-cli reconcile --limit 500
//!
//! # Drop expired refresh tokens and blacklist entries
//! bc-cli tokens purge
//! ```

use std::sync::Arc;

use chrono::Utc;

use business_cart_checkout::db::{Repositories, TokenRepository};
use business_cart_checkout::services::{OrderLedger, ReconcileReport, StubGateway};

use super::{CommandError, connect};

/// Retry cleanup for up to `limit` orders.
pub async fn reconcile(limit: u32) -> Result<ReconcileReport, CommandError> {
    let repos = Repositories::postgres(connect().await?);
    // Reconciliation never charges; the gateway is unused.
    let ledger = OrderLedger::new(repos.quotes, repos.carts, repos.orders, Arc::new(StubGateway));

    let report = ledger
        .reconcile(limit)
        .await
        .map_err(|e| CommandError::Invalid(e.to_string()))?;

    tracing::info!(
        "Reconcile complete: {} attempted, {} completed, {} failed",
        report.attempted,
        report.completed,
        report.failed
    );
    Ok(report)
}

/// Delete refresh and blacklist rows past their expiry.
pub async fn purge_tokens() -> Result<u64, CommandError> {
    let repos = Repositories::postgres(connect().await?);
    let removed = repos.tokens.purge_expired(Utc::now()).await?;
    tracing::info!("Purged {} expired token rows", removed);
    Ok(removed)
}
