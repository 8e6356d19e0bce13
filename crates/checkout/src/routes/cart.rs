//! Cart route handlers.
//!
//! The buyer is always the caller. The seller comes from the `companyId`
//! query parameter, or from the product for additions.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use business_cart_core::{AccountId, CartItemId, ProductId};

use crate::error::{ApiJson, ApiPath, ApiQuery, Result};
use crate::middleware::RequireAuth;
use crate::models::Cart;
use crate::state::AppState;

/// `?companyId=` naming the seller whose cart is meant.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerQuery {
    pub company_id: AccountId,
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Quantity update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

#[instrument(skip_all, fields(account_id = %claims.subject, seller_id = %query.company_id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiQuery(query): ApiQuery<SellerQuery>,
) -> Result<ApiJson<Cart>> {
    let cart = state.carts().view(claims.subject, query.company_id).await?;
    Ok(ApiJson(cart))
}

#[instrument(skip_all, fields(account_id = %claims.subject, product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiJson(form): ApiJson<AddItemRequest>,
) -> Result<ApiJson<Cart>> {
    let cart = state
        .carts()
        .add_product(&claims, form.product_id, form.quantity)
        .await?;
    Ok(ApiJson(cart))
}

#[instrument(skip_all, fields(account_id = %claims.subject, item_id = %item_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiPath(item_id): ApiPath<CartItemId>,
    ApiQuery(query): ApiQuery<SellerQuery>,
    ApiJson(form): ApiJson<UpdateItemRequest>,
) -> Result<ApiJson<Cart>> {
    let cart = state
        .carts()
        .set_item_quantity(claims.subject, query.company_id, item_id, form.quantity)
        .await?;
    Ok(ApiJson(cart))
}

#[instrument(skip_all, fields(account_id = %claims.subject, item_id = %item_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiPath(item_id): ApiPath<CartItemId>,
    ApiQuery(query): ApiQuery<SellerQuery>,
) -> Result<ApiJson<Cart>> {
    let cart = state
        .carts()
        .remove_item(claims.subject, query.company_id, item_id)
        .await?;
    Ok(ApiJson(cart))
}

#[instrument(skip_all, fields(account_id = %claims.subject, seller_id = %query.company_id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    ApiQuery(query): ApiQuery<SellerQuery>,
) -> Result<ApiJson<Cart>> {
    let cart = state.carts().clear(claims.subject, query.company_id).await?;
    Ok(ApiJson(cart))
}
