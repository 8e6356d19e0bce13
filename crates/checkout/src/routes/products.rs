//! Catalog route handlers.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use business_cart_core::{AccountId, Money, ProductId};

use crate::error::{ApiJson, ApiPath, Result};
use crate::middleware::RequireAuth;
use crate::models::Product;
use crate::services::ProductDraft;
use crate::state::AppState;

/// Listing request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub seller_id: Option<AccountId>,
}

#[instrument(skip_all, fields(account_id = %claims.subject))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiJson(form): ApiJson<CreateProductRequest>,
) -> Result<(StatusCode, ApiJson<Product>)> {
    let product = state
        .catalog()
        .create(
            &claims,
            ProductDraft {
                name: form.name,
                description: form.description,
                price: form.price,
                seller_id: form.seller_id,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, ApiJson(product)))
}

#[instrument(skip_all, fields(account_id = %claims.subject))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<ApiJson<Vec<Product>>> {
    Ok(ApiJson(state.catalog().list(&claims).await?))
}

#[instrument(skip_all, fields(account_id = %claims.subject))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<ApiJson<Product>> {
    Ok(ApiJson(state.catalog().get(&claims, id).await?))
}

#[instrument(skip_all, fields(account_id = %claims.subject))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<StatusCode> {
    state.catalog().delete(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
