//! Closed enumerations that drive authorization and checkout decisions.

use serde::{Deserialize, Serialize};

/// Error returned when a string names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Account role.
///
/// Every authorization decision matches on this enum exhaustively, so adding a
/// role is a compile-time-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "account_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform operator; sees everything.
    Admin,
    /// A seller; sees its own catalog, its orders and its customers.
    Company,
    /// A buyer attached to one or more companies through customer codes.
    Customer,
    /// A partner account; sees only itself and its own purchases.
    Partner,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Company => "company",
            Self::Customer => "customer",
            Self::Partner => "partner",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "company" => Ok(Self::Company),
            "customer" => Ok(Self::Customer),
            "partner" => Ok(Self::Partner),
            _ => Err(UnknownVariant::new("role", s)),
        }
    }
}

/// Lifecycle status of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "account_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Pending,
    Suspended,
    Inactive,
}

impl AccountStatus {
    /// Whether the account may authenticate.
    #[must_use]
    pub const fn can_sign_in(&self) -> bool {
        matches!(self, Self::Active | Self::Pending)
    }
}

/// Supported payment gateways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Stripe,
    AmazonPay,
}

impl PaymentMethod {
    /// Prefix used for transaction references issued through this method.
    #[must_use]
    pub const fn transaction_prefix(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe_tx",
            Self::AmazonPay => "amazon_tx",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stripe => write!(f, "stripe"),
            Self::AmazonPay => write!(f, "amazon_pay"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stripe" => Ok(Self::Stripe),
            "amazon_pay" => Ok(Self::AmazonPay),
            _ => Err(UnknownVariant::new("payment method", s)),
        }
    }
}
