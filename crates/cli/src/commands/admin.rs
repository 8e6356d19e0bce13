//! Admin account management.
//!
//! Admins cannot self-register over HTTP; this is the only way to create one.
//!
//! # Usage
//!
//! ```bash
//! BC_ADMIN_PASSWORD='...' bc-cli admin create -e ops@example.com -n "Ops"
//! ```

use business_cart_checkout::db::{AccountRepository, PgStore, RepositoryError};
use business_cart_checkout::models::{AccountProfile, NewAccount};
use business_cart_checkout::services::auth::{hash_password, validate_password};
use business_cart_core::{AccountId, AccountStatus, Email};

use super::{CommandError, connect};

/// Create a new admin account.
///
/// # Returns
///
/// The ID of the created account.
pub async fn create(email: &str, name: &str, password: &str) -> Result<AccountId, CommandError> {
    let email = Email::parse(email).map_err(|e| CommandError::Invalid(e.to_string()))?;
    validate_password(password).map_err(|e| CommandError::Invalid(e.to_string()))?;
    let password_hash =
        hash_password(password).map_err(|e| CommandError::Invalid(e.to_string()))?;

    let store = PgStore::new(connect().await?);
    tracing::info!("Creating admin account: {}", email.as_str());

    let account = store
        .create(
            NewAccount {
                id: AccountId::generate(),
                name: name.to_owned(),
                email,
                password_hash,
                status: AccountStatus::Active,
                profile: AccountProfile::Admin,
            },
            None,
        )
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                CommandError::Invalid("an account with this email already exists".to_owned())
            }
            other => other.into(),
        })?;

    tracing::info!("Admin account created successfully! ID: {}", account.id);
    Ok(account.id)
}
