//! Onboarding code issue.
//!
//! # Usage
//!
//! ```bash
//! bc-cli code create --company ACME-CO --customer ACME-CU --partner ACME-PA
//! ```

use business_cart_checkout::db::{CodeRepository, PgStore};
use business_cart_checkout::models::{Code, NewCode};

use super::{CommandError, connect};

/// Issue a code document.
pub async fn create(
    company: &str,
    customer: &str,
    partner: Option<&str>,
) -> Result<Code, CommandError> {
    let code = NewCode {
        company_code: company.trim().to_owned(),
        customer_code: customer.trim().to_owned(),
        partner_code: partner.map(|p| p.trim().to_owned()).filter(|p| !p.is_empty()),
    };
    if code.company_code.is_empty() || code.customer_code.is_empty() {
        return Err(CommandError::Invalid(
            "company and customer codes cannot be empty".to_owned(),
        ));
    }

    let store = PgStore::new(connect().await?);
    let code = store.create(code).await?;

    tracing::info!(
        "Code issued! ID: {}, company: {}, customer: {}",
        code.id,
        code.company_code,
        code.customer_code
    );
    Ok(code)
}
