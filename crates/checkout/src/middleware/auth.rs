//! Bearer-token extractors.
//!
//! Claims are decoded once here and handed to handlers by value; nothing
//! downstream looks at the raw token again.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use business_cart_core::Claims;

use crate::error::AppError;
use crate::services::AuthError;
use crate::state::AppState;

/// Extract the raw bearer token from the `Authorization` header.
///
/// # Errors
///
/// Returns `AuthError::MissingToken` if the header is absent or not a bearer
/// credential.
pub fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            v.strip_prefix("Bearer ")
                .or_else(|| v.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Extractor that requires a valid, unrevoked access token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(claims): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", claims.subject)
/// }
/// ```
pub struct RequireAuth(pub Claims);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.auth().tokens().verify(token).await?;

        tracing::Span::current().record("account_id", tracing::field::display(claims.subject));
        crate::error::set_sentry_user(&claims.subject);

        Ok(Self(claims))
    }
}

/// Extractor that requires an admin access token.
pub struct RequireAdmin(pub Claims);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(claims) = RequireAuth::from_request_parts(parts, state).await?;
        if !claims.is_admin() {
            return Err(AppError::Forbidden("admin access required".to_owned()));
        }
        Ok(Self(claims))
    }
}

/// The verified access token itself, for handlers that revoke it.
pub struct AccessToken {
    pub claims: Claims,
    pub token: String,
}

impl FromRequestParts<AppState> for AccessToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.to_owned();
        let claims = state.auth().tokens().verify(&token).await?;
        Ok(Self { claims, token })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/orders");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))).ok(), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("bearer  abc "))).ok(), Some("abc"));
        assert!(matches!(
            bearer_token(&parts(Some("Basic dXNlcg=="))),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            bearer_token(&parts(Some("Bearer "))),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(bearer_token(&parts(None)), Err(AuthError::MissingToken)));
    }
}
