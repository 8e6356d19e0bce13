//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! bc-cli migrate
//! ```
//!
//! # Migration Files
//!
//! `crates/checkout/migrations/`, applied in filename order.

use super::{CommandError, connect};

/// Run checkout database migrations.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running checkout migrations...");
    sqlx::migrate!("../checkout/migrations").run(&pool).await?;

    tracing::info!("Checkout migrations complete!");
    Ok(())
}
