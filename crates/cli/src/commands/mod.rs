//! `bc-cli` subcommands.
//!
//! Every command talks to the checkout database named by
//! `CHECKOUT_DATABASE_URL` (falling back to `DATABASE_URL`).

pub mod admin;
pub mod codes;
pub mod maintenance;
pub mod migrate;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use business_cart_checkout::db::{self, RepositoryError};

/// Errors shared by every command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Invalid command input.
    #[error("{0}")]
    Invalid(String),
}

/// Connect to the checkout database.
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("CHECKOUT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CommandError::MissingEnvVar("CHECKOUT_DATABASE_URL"))?;

    tracing::info!("Connecting to checkout database...");
    Ok(db::create_pool(&SecretString::from(database_url)).await?)
}
