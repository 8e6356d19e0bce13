//! Refresh-token records and the access-token blacklist.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use business_cart_core::AccountId;

use super::PgStore;
use crate::db::{RepositoryError, TokenRepository};
use crate::models::RefreshTokenRecord;

#[derive(sqlx::FromRow)]
struct RefreshRow {
    id: Uuid,
    account_id: AccountId,
    expires_at: DateTime<Utc>,
}

impl From<RefreshRow> for RefreshTokenRecord {
    fn from(row: RefreshRow) -> Self {
        Self {
            token_id: row.id,
            account_id: row.account_id,
            expires_at: row.expires_at,
        }
    }
}

#[async_trait]
impl TokenRepository for PgStore {
    async fn store_refresh(&self, record: RefreshTokenRecord) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO refresh_tokens (id, account_id, expires_at) VALUES ($1, $2, $3)")
            .bind(record.token_id)
            .bind(record.account_id)
            .bind(record.expires_at)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn take_refresh(
        &self,
        token_id: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, RefreshRow>(
            "DELETE FROM refresh_tokens WHERE id = $1 RETURNING id, account_id, expires_at",
        )
        .bind(token_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(RefreshTokenRecord::from))
    }

    async fn blacklist(
        &self,
        token_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO blacklisted_tokens (id, expires_at) VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(token_id)
        .bind(expires_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn is_blacklisted(&self, token_id: Uuid) -> Result<bool, RepositoryError> {
        let found: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM blacklisted_tokens WHERE id = $1)")
                .bind(token_id)
                .fetch_one(self.pool())
                .await?;
        Ok(found)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut tx = self.pool().begin().await?;
        let refresh = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&mut *tx)
            .await?;
        let blacklist = sqlx::query("DELETE FROM blacklisted_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(refresh.rows_affected() + blacklist.rows_affected())
    }
}
