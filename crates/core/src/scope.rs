//! Role-scoped visibility.
//!
//! Every list and read path over accounts, products and orders resolves a
//! [`Predicate`] here first and hands it to storage. Storage backends translate
//! the predicate into their own query language; [`Predicate`] also evaluates
//! itself against plain values so in-memory backends and single-entity reads
//! share the exact same rules.
//!
//! | Resource | admin | company | customer / partner |
//! |---|---|---|---|
//! | accounts | all | self, or customers holding one of its codes | self |
//! | products | all | seller is self | seller in associated companies |
//! | orders | all | seller is self | buyer is self |

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Role};

/// The collection a predicate filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Accounts,
    Products,
    Orders,
}

/// A visibility filter over one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Predicate {
    /// No restriction.
    MatchAll,
    /// The account itself, plus customer accounts associated with it.
    AccountOrItsCustomers(AccountId),
    /// Exactly one account.
    AccountIs(AccountId),
    /// Rows sold by one seller.
    SellerIs(AccountId),
    /// Rows sold by any of the listed sellers. An empty list matches nothing.
    SellerIn(Vec<AccountId>),
    /// Rows bought by one buyer.
    BuyerIs(AccountId),
}

/// Resolve the visibility predicate for a caller over a resource.
///
/// Pure and total over the closed [`Role`] enumeration. A role outside the
/// enumeration cannot reach this function: it fails to decode at the token
/// boundary and the request is rejected as unauthenticated.
#[must_use]
pub fn resolve_filter(
    role: Role,
    subject: AccountId,
    associated_company_ids: &[AccountId],
    resource: Resource,
) -> Predicate {
    match (resource, role) {
        (_, Role::Admin) => Predicate::MatchAll,

        (Resource::Accounts, Role::Company) => Predicate::AccountOrItsCustomers(subject),
        (Resource::Accounts, Role::Customer | Role::Partner) => Predicate::AccountIs(subject),

        (Resource::Products | Resource::Orders, Role::Company) => Predicate::SellerIs(subject),
        (Resource::Products, Role::Customer | Role::Partner) => {
            let mut sellers = associated_company_ids.to_vec();
            sellers.sort_unstable();
            sellers.dedup();
            Predicate::SellerIn(sellers)
        }
        (Resource::Orders, Role::Customer | Role::Partner) => Predicate::BuyerIs(subject),
    }
}

impl Predicate {
    /// Evaluate against an account.
    ///
    /// `associated_company_ids` are the companies the account is linked to
    /// (empty for non-customers).
    #[must_use]
    pub fn admits_account(&self, id: AccountId, associated_company_ids: &[AccountId]) -> bool {
        match self {
            Self::MatchAll => true,
            Self::AccountIs(subject) => *subject == id,
            Self::AccountOrItsCustomers(company) => {
                *company == id || associated_company_ids.contains(company)
            }
            Self::SellerIs(_) | Self::SellerIn(_) | Self::BuyerIs(_) => false,
        }
    }

    /// Evaluate against a product listed by `seller`.
    #[must_use]
    pub fn admits_product(&self, seller: AccountId) -> bool {
        match self {
            Self::MatchAll => true,
            Self::SellerIs(id) => *id == seller,
            Self::SellerIn(ids) => ids.contains(&seller),
            Self::AccountOrItsCustomers(_) | Self::AccountIs(_) | Self::BuyerIs(_) => false,
        }
    }

    /// Evaluate against an order between `seller` and `buyer`.
    #[must_use]
    pub fn admits_order(&self, seller: AccountId, buyer: AccountId) -> bool {
        match self {
            Self::MatchAll => true,
            Self::SellerIs(id) => *id == seller,
            Self::SellerIn(ids) => ids.contains(&seller),
            Self::BuyerIs(id) => *id == buyer,
            Self::AccountOrItsCustomers(_) | Self::AccountIs(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (AccountId, AccountId, AccountId) {
        (
            AccountId::generate(),
            AccountId::generate(),
            AccountId::generate(),
        )
    }

    #[test]
    fn test_admin_matches_all_everywhere() {
        let (me, _, _) = ids();
        for resource in [Resource::Accounts, Resource::Products, Resource::Orders] {
            assert_eq!(
                resolve_filter(Role::Admin, me, &[], resource),
                Predicate::MatchAll
            );
        }
    }

    #[test]
    fn test_customer_products_scoped_to_associated_sellers() {
        let (me, a, b) = ids();
        let predicate = resolve_filter(Role::Customer, me, &[a, b], Resource::Products);

        assert!(predicate.admits_product(a));
        assert!(predicate.admits_product(b));
        assert!(!predicate.admits_product(me));
        assert!(!predicate.admits_product(AccountId::generate()));
    }

    #[test]
    fn test_customer_orders_scoped_to_buyer_never_seller() {
        let (me, a, b) = ids();
        let predicate = resolve_filter(Role::Customer, me, &[a, b], Resource::Orders);

        assert_eq!(predicate, Predicate::BuyerIs(me));
        assert!(predicate.admits_order(a, me));
        assert!(!predicate.admits_order(a, AccountId::generate()));
        // Being associated with the seller does not expose other buyers' orders.
        assert!(!predicate.admits_order(b, b));
    }

    #[test]
    fn test_partner_behaves_like_customer() {
        let (me, a, _) = ids();
        assert_eq!(
            resolve_filter(Role::Partner, me, &[a], Resource::Accounts),
            Predicate::AccountIs(me)
        );
        assert_eq!(
            resolve_filter(Role::Partner, me, &[a], Resource::Orders),
            Predicate::BuyerIs(me)
        );
        assert_eq!(
            resolve_filter(Role::Partner, me, &[a], Resource::Products),
            Predicate::SellerIn(vec![a])
        );
    }

    #[test]
    fn test_company_sees_itself_and_its_customers() {
        let (company, customer, stranger) = ids();
        let predicate = resolve_filter(Role::Company, company, &[], Resource::Accounts);

        assert!(predicate.admits_account(company, &[]));
        assert!(predicate.admits_account(customer, &[company]));
        assert!(!predicate.admits_account(stranger, &[AccountId::generate()]));
    }

    #[test]
    fn test_company_products_and_orders_are_seller_scoped() {
        let (company, buyer, other) = ids();
        let products = resolve_filter(Role::Company, company, &[], Resource::Products);
        let orders = resolve_filter(Role::Company, company, &[], Resource::Orders);

        assert!(products.admits_product(company));
        assert!(!products.admits_product(other));
        assert!(orders.admits_order(company, buyer));
        assert!(!orders.admits_order(other, company));
    }

    #[test]
    fn test_customer_without_associations_sees_no_products() {
        let (me, _, _) = ids();
        let predicate = resolve_filter(Role::Customer, me, &[], Resource::Products);
        assert_eq!(predicate, Predicate::SellerIn(Vec::new()));
        assert!(!predicate.admits_product(AccountId::generate()));
    }

    #[test]
    fn test_associated_ids_are_deduplicated() {
        let (me, a, _) = ids();
        let predicate = resolve_filter(Role::Customer, me, &[a, a, a], Resource::Products);
        assert_eq!(predicate, Predicate::SellerIn(vec![a]));
    }
}
