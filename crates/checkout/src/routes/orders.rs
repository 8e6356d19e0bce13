//! Order route handlers.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use business_cart_core::{OrderId, PaymentMethod, QuoteId};

use crate::error::{ApiJson, ApiPath, Result};
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::state::AppState;

/// Order placement request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub quote_id: QuoteId,
    pub payment_token: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

#[instrument(skip_all, fields(account_id = %claims.subject, quote_id = %form.quote_id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiJson(form): ApiJson<PlaceOrderRequest>,
) -> Result<ApiJson<Order>> {
    let order = state
        .orders()
        .place_order(
            form.quote_id,
            claims.subject,
            form.payment_method,
            &form.payment_token,
        )
        .await?;
    Ok(ApiJson(order))
}

#[instrument(skip_all, fields(account_id = %claims.subject))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<ApiJson<Vec<Order>>> {
    Ok(ApiJson(state.orders().list_orders(&claims).await?))
}

#[instrument(skip_all, fields(account_id = %claims.subject, order_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<ApiJson<Order>> {
    Ok(ApiJson(state.orders().get_order(&claims, id).await?))
}
