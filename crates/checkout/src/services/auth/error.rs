//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] business_cart_core::EmailError),

    /// Invalid credentials (wrong password or unknown email).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but may not sign in.
    #[error("account is not active")]
    AccountInactive,

    /// Email already registered.
    #[error("email already registered")]
    EmailTaken,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Registration asked for a role that cannot self-register.
    #[error("invalid role: {0}")]
    InvalidRole(String),

    /// Missing, unknown, already-claimed or wrong-kind onboarding code.
    #[error("invalid code: {0}")]
    InvalidCode(String),

    /// Other malformed registration input.
    #[error("{0}")]
    Invalid(String),

    /// No bearer credential was presented.
    #[error("missing credentials")]
    MissingToken,

    /// The token signature does not verify.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The token is not a well-formed credential (bad encoding, unknown role).
    #[error("malformed token")]
    MalformedToken,

    /// The token is past its expiry.
    #[error("token expired")]
    Expired,

    /// The access token was revoked.
    #[error("token revoked")]
    Blacklisted,

    /// The refresh token is unknown or was already used.
    #[error("refresh token not found")]
    RefreshNotFound,

    /// The account behind a token no longer exists.
    #[error("account not found")]
    AccountNotFound,

    /// Token signing failed.
    #[error("token signing failed: {0}")]
    Signing(jsonwebtoken::errors::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Whether the error means the presented credential is unusable.
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::MissingToken
                | Self::InvalidSignature
                | Self::MalformedToken
                | Self::Expired
                | Self::Blacklisted
                | Self::RefreshNotFound
                | Self::AccountNotFound
        )
    }
}
