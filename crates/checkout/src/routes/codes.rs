//! Onboarding code route handlers (admin only).

use axum::{extract::State, http::StatusCode};
use tracing::instrument;

use crate::error::{ApiJson, ApiPath, AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Code, NewCode};
use crate::state::AppState;

/// Issue a code document.
#[instrument(skip_all, fields(admin_id = %admin.subject))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(form): ApiJson<NewCode>,
) -> Result<(StatusCode, ApiJson<Code>)> {
    let form = NewCode {
        company_code: form.company_code.trim().to_owned(),
        customer_code: form.customer_code.trim().to_owned(),
        partner_code: form
            .partner_code
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty()),
    };
    if form.company_code.is_empty() || form.customer_code.is_empty() {
        return Err(AppError::BadRequest(
            "companyCode and customerCode are required".to_owned(),
        ));
    }

    let code = state.repos().codes.create(form).await?;
    tracing::info!(code_id = %code.id, "Code issued");
    Ok((StatusCode::CREATED, ApiJson(code)))
}

/// Look up a code document by any of its values.
#[instrument(skip_all, fields(admin_id = %admin.subject))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(value): ApiPath<String>,
) -> Result<ApiJson<Code>> {
    state
        .repos()
        .codes
        .find_by_value(&value)
        .await?
        .map(ApiJson)
        .ok_or_else(|| AppError::NotFound("code not found".to_owned()))
}
