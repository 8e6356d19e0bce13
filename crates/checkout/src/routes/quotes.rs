//! Quote route handlers.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use business_cart_core::{AccountId, QuoteId};

use crate::error::{ApiJson, ApiPath, Result};
use crate::middleware::RequireAuth;
use crate::models::Quote;
use crate::state::AppState;

/// Quote request body: the seller whose cart to quote.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteRequest {
    pub company_id: AccountId,
}

#[instrument(skip_all, fields(account_id = %claims.subject, seller_id = %form.company_id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiJson(form): ApiJson<CreateQuoteRequest>,
) -> Result<ApiJson<Quote>> {
    let quote = state
        .quotes()
        .quote_cart(claims.subject, form.company_id)
        .await?;
    Ok(ApiJson(quote))
}

#[instrument(skip_all, fields(account_id = %claims.subject, quote_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiPath(id): ApiPath<QuoteId>,
) -> Result<ApiJson<Quote>> {
    Ok(ApiJson(state.quotes().get_owned(id, &claims).await?))
}
