//! Accounts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};

use business_cart_core::{AccountId, AccountStatus, CodeId, Email, Predicate, Role};

use super::{PgStore, ScopeColumns, push_scope};
use crate::db::{AccountRepository, RepositoryError, conflict_on_unique};
use crate::models::{Account, AccountProfile, NewAccount};

const ACCOUNT_SCOPE: ScopeColumns = ScopeColumns {
    id: "id",
    seller: None,
    buyer: None,
    customer_profile: Some("profile"),
};

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: AccountId,
    name: String,
    email: String,
    password_hash: String,
    role: Role,
    status: AccountStatus,
    profile: Json<AccountProfile>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let profile = row.profile.0;
        if profile.role() != row.role {
            return Err(RepositoryError::DataCorruption(format!(
                "account {} has role {} but a {} profile",
                row.id,
                row.role,
                profile.role()
            )));
        }

        Ok(Self {
            id: row.id,
            name: row.name,
            email,
            password_hash: row.password_hash,
            role: row.role,
            status: row.status,
            profile,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_ACCOUNT: &str = r"
    SELECT id, name, email, password_hash, role, status, profile, created_at, updated_at
    FROM accounts
";

#[async_trait]
impl AccountRepository for PgStore {
    async fn create(
        &self,
        account: NewAccount,
        claim: Option<CodeId>,
    ) -> Result<Account, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        if let Some(code_id) = claim {
            let claimed = sqlx::query(
                r"
                UPDATE codes SET is_claimed = TRUE
                WHERE id = $1 AND NOT is_claimed
                ",
            )
            .bind(code_id)
            .execute(&mut *tx)
            .await?;

            if claimed.rows_affected() == 0 {
                return Err(RepositoryError::Stale("code is not claimable".to_owned()));
            }
        }

        let role = account.profile.role();
        let row = sqlx::query_as::<_, AccountRow>(
            r"
            INSERT INTO accounts (id, name, email, password_hash, role, status, profile)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, email, password_hash, role, status, profile, created_at, updated_at
            ",
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(account.email.as_str())
        .bind(&account.password_hash)
        .bind(role)
        .bind(account.status)
        .bind(Json(&account.profile))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "email already exists"))?;

        tx.commit().await?;
        row.try_into()
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        sqlx::query_as::<_, AccountRow>(&format!("{SELECT_ACCOUNT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        sqlx::query_as::<_, AccountRow>(&format!("{SELECT_ACCOUNT} WHERE email = $1"))
            .bind(email.as_str())
            .fetch_optional(self.pool())
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn list(&self, predicate: &Predicate) -> Result<Vec<Account>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_ACCOUNT);
        qb.push(" WHERE ");
        push_scope(&mut qb, predicate, ACCOUNT_SCOPE);
        qb.push(" ORDER BY created_at DESC");

        qb.build_query_as::<AccountRow>()
            .fetch_all(self.pool())
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }
}
