//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Service errors are folded into
//! one status code and a short JSON message `{"error": "..."}`; storage detail
//! is logged and captured to Sentry, never sent to the client.

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{
    AuthError, CartError, CatalogError, OrderError, PaymentError, QuoteError,
};

/// Application-level error type for the checkout service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Storage operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Quote error: {0}")]
    Quote(#[from] QuoteError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Malformed or missing request fields.
    #[error("{0}")]
    BadRequest(String),

    /// The caller's role may not perform the operation.
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate resource.
    #[error("{0}")]
    Conflict(String),
}

impl AppError {
    /// Status code for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Auth(err) => auth_status(err),
            Self::Catalog(err) => match err {
                CatalogError::Invalid(_) => StatusCode::BAD_REQUEST,
                CatalogError::Forbidden(_) => StatusCode::FORBIDDEN,
                CatalogError::NotFound => StatusCode::NOT_FOUND,
                CatalogError::Repository(err) => repository_status(err),
            },
            Self::Cart(err) => match err {
                CartError::InvalidQuantity => StatusCode::BAD_REQUEST,
                CartError::NotFound | CartError::ProductNotFound => StatusCode::NOT_FOUND,
                CartError::Repository(err) => repository_status(err),
            },
            Self::Quote(err) => match err {
                QuoteError::EmptyCart => StatusCode::BAD_REQUEST,
                QuoteError::CartNotFound | QuoteError::NotFound => StatusCode::NOT_FOUND,
                QuoteError::NotOwner => StatusCode::FORBIDDEN,
                QuoteError::Repository(err) => repository_status(err),
            },
            Self::Order(err) => match err {
                OrderError::QuoteExpired => StatusCode::BAD_REQUEST,
                OrderError::NotOwner => StatusCode::FORBIDDEN,
                OrderError::QuoteNotFound | OrderError::NotFound => StatusCode::NOT_FOUND,
                OrderError::PaymentDeclined | OrderError::Payment(_) => StatusCode::BAD_GATEWAY,
                OrderError::Repository(err) => repository_status(err),
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Whether this is a system fault rather than a refused request.
    ///
    /// A declined charge is the buyer's problem; an unreachable gateway is ours.
    fn is_fault(&self) -> bool {
        match self {
            Self::Order(OrderError::PaymentDeclined) => false,
            Self::Order(OrderError::Payment(_)) => true,
            other => other.status() == StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client.
    fn public_message(&self) -> String {
        match self {
            Self::Order(OrderError::PaymentDeclined) => return "Payment declined".to_owned(),
            Self::Order(OrderError::Payment(_)) => return "Payment failed".to_owned(),
            other if other.is_fault() => return "Internal server error".to_owned(),
            _ => {}
        }
        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_owned(),
                AuthError::EmailTaken => "An account with this email already exists".to_owned(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_owned(),
                AuthError::MissingToken => "Missing bearer token".to_owned(),
                AuthError::InvalidSignature | AuthError::MalformedToken => {
                    "Invalid token".to_owned()
                }
                other => other.to_string(),
            },
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::Database(RepositoryError::NotFound) => "Not found".to_owned(),
            Self::Database(RepositoryError::OutOfRange(what)) => format!("{what} is out of range"),
            Self::Catalog(err) => err.to_string(),
            Self::Cart(err) => err.to_string(),
            Self::Quote(err) => err.to_string(),
            Self::Order(err) => err.to_string(),
            other => other.to_string(),
        }
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::OutOfRange(_) => StatusCode::BAD_REQUEST,
        RepositoryError::Database(_)
        | RepositoryError::DataCorruption(_)
        | RepositoryError::Stale(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn auth_status(err: &AuthError) -> StatusCode {
    if err.is_unauthenticated() {
        return StatusCode::UNAUTHORIZED;
    }
    match err {
        AuthError::InvalidEmail(_)
        | AuthError::WeakPassword(_)
        | AuthError::InvalidRole(_)
        | AuthError::InvalidCode(_)
        | AuthError::Invalid(_) => StatusCode::BAD_REQUEST,
        AuthError::AccountInactive => StatusCode::FORBIDDEN,
        AuthError::EmailTaken => StatusCode::CONFLICT,
        AuthError::Repository(err) => repository_status(err),
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if self.is_fault() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if matches!(self, Self::Order(OrderError::PaymentDeclined))
            || status == StatusCode::FORBIDDEN
        {
            tracing::warn!(error = %self, status = status.as_u16(), "Request refused");
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        Self::Order(err.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// `Json` extractor whose rejection is a 400 `AppError`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl<T: serde::Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

/// `Query` extractor whose rejection is a 400 `AppError`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// `Path` extractor whose rejection is a 400 `AppError`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated account.
pub fn set_sentry_user(account_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(account_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_checkout_errors_map_to_contract_statuses() {
        assert_eq!(status(QuoteError::EmptyCart), StatusCode::BAD_REQUEST);
        assert_eq!(status(QuoteError::CartNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(QuoteError::NotOwner), StatusCode::FORBIDDEN);
        assert_eq!(status(OrderError::QuoteExpired), StatusCode::BAD_REQUEST);
        assert_eq!(status(OrderError::QuoteNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(PaymentError::Declined), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status(PaymentError::Unavailable("timeout".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status(CartError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status(CartError::InvalidQuantity), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(CartError::from(RepositoryError::OutOfRange("quantity".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(RepositoryError::OutOfRange("quantity".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_auth_errors_map_to_contract_statuses() {
        assert_eq!(status(AuthError::Expired), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AuthError::Blacklisted), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AuthError::MissingToken), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AuthError::AccountInactive), StatusCode::FORBIDDEN);
        assert_eq!(status(AuthError::EmailTaken), StatusCode::CONFLICT);
        assert_eq!(
            status(AuthError::InvalidRole("admin".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(RepositoryError::Conflict("code 'X' already exists".into())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_storage_detail_is_not_exposed() {
        let err = AppError::Database(RepositoryError::DataCorruption(
            "accounts.profile is not JSON".into(),
        ));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_decline_is_not_a_fault() {
        let declined = AppError::from(PaymentError::Declined);
        assert!(!declined.is_fault());
        assert_eq!(declined.public_message(), "Payment declined");
        assert!(AppError::from(PaymentError::Unavailable("dns".into())).is_fault());
    }
}
