//! Decoded payload of a signed credential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::AccountId;
use super::role::Role;

/// Identity, role and company associations carried by a verified token.
///
/// Decoded once at the request boundary and then passed by reference; nothing
/// downstream re-parses the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated account.
    pub subject: AccountId,
    /// The account's role at issue time.
    pub role: Role,
    /// The seller identity of a company account.
    pub company_id: Option<AccountId>,
    /// Companies a customer buys from (derived from its customer codes).
    pub associated_company_ids: Vec<AccountId>,
    /// When the credential stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    /// Whether the credential has passed its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the caller is the platform admin.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// The seller identity this caller acts as.
    ///
    /// Falls back to the subject for company accounts issued without an
    /// explicit company id.
    #[must_use]
    pub fn seller_identity(&self) -> Option<AccountId> {
        match self.role {
            Role::Company => Some(self.company_id.unwrap_or(self.subject)),
            Role::Admin | Role::Customer | Role::Partner => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn claims(role: Role) -> Claims {
        Claims {
            subject: AccountId::generate(),
            role,
            company_id: None,
            associated_company_ids: Vec::new(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let c = claims(Role::Customer);
        assert!(!c.is_expired_at(c.expires_at - Duration::seconds(1)));
        assert!(c.is_expired_at(c.expires_at));
    }

    #[test]
    fn test_seller_identity_only_for_companies() {
        let company = claims(Role::Company);
        assert_eq!(company.seller_identity(), Some(company.subject));
        assert_eq!(claims(Role::Customer).seller_identity(), None);
        assert_eq!(claims(Role::Admin).seller_identity(), None);
    }
}
