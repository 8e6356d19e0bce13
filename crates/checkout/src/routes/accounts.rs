//! Account route handlers.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use business_cart_core::{AccountId, Role};

use crate::error::{ApiJson, ApiPath, AppError, Result};
use crate::middleware::{AccessToken, RequireAuth};
use crate::models::Account;
use crate::services::{AuthError, Registration, TokenPair};
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub customer_codes: Vec<String>,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Refresh request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Logout request body; may be omitted entirely.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Register a company, customer or partner.
#[instrument(skip_all, fields(role = %form.role))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, ApiJson<Account>)> {
    let role: Role = form
        .role
        .parse()
        .map_err(|_| AuthError::InvalidRole(form.role.clone()))?;

    let account = state
        .auth()
        .register(Registration {
            name: form.name,
            email: form.email,
            password: form.password,
            role,
            code: form.code,
            customer_codes: form.customer_codes,
        })
        .await?;

    Ok((StatusCode::CREATED, ApiJson(account)))
}

/// Exchange email and password for a token pair.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<LoginRequest>,
) -> Result<ApiJson<TokenPair>> {
    let pair = state.auth().login(&form.email, &form.password).await?;
    Ok(ApiJson(pair))
}

/// Rotate a refresh token.
#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<RefreshRequest>,
) -> Result<ApiJson<TokenPair>> {
    let pair = state.auth().refresh(&form.refresh_token).await?;
    Ok(ApiJson(pair))
}

/// Revoke the presented access token and, if sent, a refresh token.
#[instrument(skip_all, fields(account_id = %access.claims.subject))]
pub async fn logout(
    State(state): State<AppState>,
    access: AccessToken,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let form: LogoutRequest = if body.iter().all(u8::is_ascii_whitespace) {
        LogoutRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(e.to_string()))?
    };

    state
        .auth()
        .logout(&access.token, form.refresh_token.as_deref())
        .await?;

    tracing::info!("Account signed out");
    Ok(StatusCode::NO_CONTENT)
}

/// Accounts visible to the caller.
#[instrument(skip_all, fields(account_id = %claims.subject))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<ApiJson<Vec<Account>>> {
    Ok(ApiJson(state.auth().list_accounts(&claims).await?))
}

/// One account, if visible to the caller.
#[instrument(skip_all, fields(account_id = %claims.subject))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiPath(id): ApiPath<AccountId>,
) -> Result<ApiJson<Account>> {
    let account = state
        .auth()
        .get_account(&claims, id)
        .await
        .map_err(|e| match e {
            AuthError::AccountNotFound => AppError::NotFound("account not found".to_owned()),
            other => other.into(),
        })?;
    Ok(ApiJson(account))
}
