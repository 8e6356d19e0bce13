//! Onboarding codes.
//!
//! Each value of a code document is also written to `code_values`, whose
//! primary key makes values unique across the company, customer and partner
//! columns of every document.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use business_cart_core::CodeId;

use super::PgStore;
use crate::db::{CodeRepository, RepositoryError, conflict_on_unique};
use crate::models::{Code, NewCode};

#[derive(sqlx::FromRow)]
struct CodeRow {
    id: CodeId,
    company_code: String,
    customer_code: String,
    partner_code: Option<String>,
    is_claimed: bool,
    created_at: DateTime<Utc>,
}

impl From<CodeRow> for Code {
    fn from(row: CodeRow) -> Self {
        Self {
            id: row.id,
            company_code: row.company_code,
            customer_code: row.customer_code,
            partner_code: row.partner_code,
            is_claimed: row.is_claimed,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl CodeRepository for PgStore {
    async fn create(&self, code: NewCode) -> Result<Code, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query_as::<_, CodeRow>(
            r"
            INSERT INTO codes (id, company_code, customer_code, partner_code)
            VALUES ($1, $2, $3, $4)
            RETURNING id, company_code, customer_code, partner_code, is_claimed, created_at
            ",
        )
        .bind(CodeId::generate())
        .bind(&code.company_code)
        .bind(&code.customer_code)
        .bind(code.partner_code.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        for value in code.values() {
            sqlx::query("INSERT INTO code_values (value, code_id) VALUES ($1, $2)")
                .bind(value)
                .bind(row.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| conflict_on_unique(e, &format!("code '{value}' already exists")))?;
        }

        tx.commit().await?;
        Ok(row.into())
    }

    async fn find_by_value(&self, value: &str) -> Result<Option<Code>, RepositoryError> {
        let row = sqlx::query_as::<_, CodeRow>(
            r"
            SELECT c.id, c.company_code, c.customer_code, c.partner_code, c.is_claimed, c.created_at
            FROM code_values v
            JOIN codes c ON c.id = v.code_id
            WHERE v.value = $1
            ",
        )
        .bind(value)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Code::from))
    }
}
