//! Account, onboarding-code and credential-lifecycle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use business_cart_core::{AccountId, AccountStatus, CodeId, Email, Role};

/// Setup progress of a company or partner profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    PendingSetup,
    Pending,
    Active,
}

/// A customer's link to a company, through one of that company's customer codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCode {
    /// Identifier of the code document; equal to the owning company's account id.
    pub code_id: CodeId,
    /// The customer code value the account registered with.
    pub code: String,
}

/// Role-specific account payload.
///
/// Stored as a JSON document alongside the account row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AccountProfile {
    Admin,
    Company {
        company_code_id: CodeId,
        company_code: String,
        status: ProfileStatus,
    },
    Customer {
        customer_codes: Vec<CustomerCode>,
    },
    Partner {
        partner_code_id: Option<CodeId>,
        partner_code: Option<String>,
        status: ProfileStatus,
    },
}

impl AccountProfile {
    /// The role this profile belongs to.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Admin => Role::Admin,
            Self::Company { .. } => Role::Company,
            Self::Customer { .. } => Role::Customer,
            Self::Partner { .. } => Role::Partner,
        }
    }

    /// Companies this account buys from.
    ///
    /// Exactly the code ids of its customer codes; empty for every other role.
    #[must_use]
    pub fn associated_company_ids(&self) -> Vec<AccountId> {
        match self {
            Self::Customer { customer_codes } => {
                let mut ids: Vec<AccountId> = customer_codes
                    .iter()
                    .map(|c| c.code_id.as_account_id())
                    .collect();
                ids.sort_unstable();
                ids.dedup();
                ids
            }
            Self::Admin | Self::Company { .. } | Self::Partner { .. } => Vec::new(),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: Email,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub status: AccountStatus,
    pub profile: AccountProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Company id carried in this account's credentials.
    #[must_use]
    pub const fn company_id(&self) -> Option<AccountId> {
        match self.role {
            Role::Company => Some(self.id),
            Role::Admin | Role::Customer | Role::Partner => None,
        }
    }
}

/// Input for inserting an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub id: AccountId,
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub status: AccountStatus,
    pub profile: AccountProfile,
}

/// A pre-issued onboarding code document.
///
/// One document carries a company code, a customer code and optionally a
/// partner code. The company (or partner) that claims it takes the document id
/// as its account id; customers registering with the customer code are linked
/// to that company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Code {
    pub id: CodeId,
    pub company_code: String,
    pub customer_code: String,
    pub partner_code: Option<String>,
    pub is_claimed: bool,
    pub created_at: DateTime<Utc>,
}

impl Code {
    /// Every value that identifies this document.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        [
            Some(self.company_code.as_str()),
            Some(self.customer_code.as_str()),
            self.partner_code.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

/// Input for issuing a code document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCode {
    pub company_code: String,
    pub customer_code: String,
    #[serde(default)]
    pub partner_code: Option<String>,
}

impl NewCode {
    /// Values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        [
            Some(self.company_code.as_str()),
            Some(self.customer_code.as_str()),
            self.partner_code.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

/// Server-side record of an issued refresh token, keyed by its token id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub token_id: Uuid,
    pub account_id: AccountId,
    pub expires_at: DateTime<Utc>,
}
