//! Product listings and who may manage them.

use std::sync::Arc;

use thiserror::Error;

use business_cart_core::{AccountId, Claims, Money, ProductId, Resource, Role, resolve_filter};

use crate::db::{AccountRepository, ProductRepository, RepositoryError};
use crate::models::{NewProduct, Product};

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The request is malformed.
    #[error("{0}")]
    Invalid(String),

    /// The caller's role may not perform the operation.
    #[error("{0}")]
    Forbidden(&'static str),

    /// The product does not exist or is not visible to the caller.
    #[error("product not found")]
    NotFound,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Fields a caller supplies when listing a product.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: Money,
    /// Seller to list under; only admins may set it.
    pub seller_id: Option<AccountId>,
}

/// Product catalog.
#[derive(Clone)]
pub struct Catalog {
    products: Arc<dyn ProductRepository>,
    accounts: Arc<dyn AccountRepository>,
}

impl Catalog {
    #[must_use]
    pub fn new(
        products: Arc<dyn ProductRepository>,
        accounts: Arc<dyn AccountRepository>,
    ) -> Self {
        Self { products, accounts }
    }

    /// List a product.
    ///
    /// Companies always list under their own seller identity. Admins must name
    /// an existing company as `seller_id`.
    ///
    /// # Errors
    ///
    /// - `Forbidden` for customers and partners
    /// - `Invalid` for an empty name, a negative price, or a bad `seller_id`
    pub async fn create(
        &self,
        claims: &Claims,
        draft: ProductDraft,
    ) -> Result<Product, CatalogError> {
        let seller_id = match claims.role {
            Role::Company => claims.seller_identity().unwrap_or(claims.subject),
            Role::Admin => {
                let seller_id = draft.seller_id.ok_or_else(|| {
                    CatalogError::Invalid("sellerId is required for admin listings".to_owned())
                })?;
                let seller = self.accounts.find_by_id(seller_id).await?;
                if !seller.is_some_and(|a| a.role == Role::Company) {
                    return Err(CatalogError::Invalid(
                        "sellerId must name a company account".to_owned(),
                    ));
                }
                seller_id
            }
            Role::Customer | Role::Partner => {
                return Err(CatalogError::Forbidden("only companies can list products"));
            }
        };

        let name = draft.name.trim();
        if name.is_empty() {
            return Err(CatalogError::Invalid("name is required".to_owned()));
        }
        if draft.price.is_negative() {
            return Err(CatalogError::Invalid("price cannot be negative".to_owned()));
        }

        let product = self
            .products
            .create(NewProduct {
                seller_id,
                name: name.to_owned(),
                description: draft.description,
                price: draft.price,
            })
            .await?;
        tracing::info!(product_id = %product.id, seller_id = %seller_id, "Product listed");
        Ok(product)
    }

    /// Products visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if storage fails.
    pub async fn list(&self, claims: &Claims) -> Result<Vec<Product>, CatalogError> {
        let predicate = resolve_filter(
            claims.role,
            claims.subject,
            &claims.associated_company_ids,
            Resource::Products,
        );
        Ok(self.products.list(&predicate).await?)
    }

    /// One product, if visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if absent or outside the caller's scope.
    pub async fn get(&self, claims: &Claims, id: ProductId) -> Result<Product, CatalogError> {
        let predicate = resolve_filter(
            claims.role,
            claims.subject,
            &claims.associated_company_ids,
            Resource::Products,
        );
        self.products
            .find_by_id(id)
            .await?
            .filter(|p| predicate.admits_product(p.seller_id))
            .ok_or(CatalogError::NotFound)
    }

    /// Remove a listing. Only its seller or an admin may.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent or invisible, `Forbidden` if visible but not owned.
    pub async fn delete(&self, claims: &Claims, id: ProductId) -> Result<(), CatalogError> {
        let product = self.get(claims, id).await?;
        let allowed = match claims.role {
            Role::Admin => true,
            Role::Company => claims.seller_identity() == Some(product.seller_id),
            Role::Customer | Role::Partner => false,
        };
        if !allowed {
            return Err(CatalogError::Forbidden("only the seller can remove a product"));
        }

        if !self.products.delete(id).await? {
            return Err(CatalogError::NotFound);
        }
        tracing::info!(product_id = %id, "Product removed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::db::Repositories;

    fn claims(subject: AccountId, role: Role, associated: Vec<AccountId>) -> Claims {
        Claims {
            subject,
            role,
            company_id: (role == Role::Company).then_some(subject),
            associated_company_ids: associated,
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    fn draft(name: &str, cents: i64) -> ProductDraft {
        ProductDraft {
            name: name.to_owned(),
            description: String::new(),
            price: Money::from_cents(cents),
            seller_id: None,
        }
    }

    fn catalog(repos: &Repositories) -> Catalog {
        Catalog::new(repos.products.clone(), repos.accounts.clone())
    }

    #[tokio::test]
    async fn test_company_lists_under_itself() {
        let repos = Repositories::in_memory();
        let company = claims(AccountId::generate(), Role::Company, vec![]);
        let mut input = draft("Limes", 300);
        input.seller_id = Some(AccountId::generate());

        let product = catalog(&repos).create(&company, input).await.unwrap();
        assert_eq!(product.seller_id, company.subject);
    }

    #[tokio::test]
    async fn test_customers_cannot_list() {
        let repos = Repositories::in_memory();
        let customer = claims(AccountId::generate(), Role::Customer, vec![]);
        let result = catalog(&repos).create(&customer, draft("Limes", 300)).await;
        assert!(matches!(result, Err(CatalogError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_admin_needs_company_seller() {
        let repos = Repositories::in_memory();
        let admin = claims(AccountId::generate(), Role::Admin, vec![]);
        let result = catalog(&repos).create(&admin, draft("Limes", 300)).await;
        assert!(matches!(result, Err(CatalogError::Invalid(_))));

        let mut input = draft("Limes", 300);
        input.seller_id = Some(AccountId::generate());
        let result = catalog(&repos).create(&admin, input).await;
        assert!(matches!(result, Err(CatalogError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_rejects_negative_price_and_blank_name() {
        let repos = Repositories::in_memory();
        let company = claims(AccountId::generate(), Role::Company, vec![]);
        let items = catalog(&repos);

        assert!(matches!(
            items.create(&company, draft("  ", 300)).await,
            Err(CatalogError::Invalid(_))
        ));
        assert!(matches!(
            items.create(&company, draft("Limes", -1)).await,
            Err(CatalogError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_visibility_and_deletion() {
        let repos = Repositories::in_memory();
        let items = catalog(&repos);
        let seller = claims(AccountId::generate(), Role::Company, vec![]);
        let rival = claims(AccountId::generate(), Role::Company, vec![]);
        let buyer = claims(AccountId::generate(), Role::Customer, vec![seller.subject]);
        let stranger = claims(AccountId::generate(), Role::Customer, vec![rival.subject]);

        let product = items.create(&seller, draft("Limes", 300)).await.unwrap();
        items.create(&rival, draft("Lemons", 250)).await.unwrap();

        assert_eq!(items.list(&buyer).await.unwrap(), vec![product.clone()]);
        assert_eq!(items.get(&buyer, product.id).await.unwrap(), product);
        assert!(matches!(
            items.get(&stranger, product.id).await,
            Err(CatalogError::NotFound)
        ));
        assert!(matches!(
            items.delete(&rival, product.id).await,
            Err(CatalogError::NotFound)
        ));
        assert!(matches!(
            items.delete(&buyer, product.id).await,
            Err(CatalogError::Forbidden(_))
        ));

        items.delete(&seller, product.id).await.unwrap();
        assert!(items.list(&buyer).await.unwrap().is_empty());
    }
}
