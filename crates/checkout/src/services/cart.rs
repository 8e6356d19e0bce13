//! Cart mutations.
//!
//! Carts are keyed by (buyer, seller). Line prices and names come from the
//! catalog when a product is added, never from the client.

use std::sync::Arc;

use thiserror::Error;

use business_cart_core::{AccountId, CartItemId, Claims, ProductId, Resource, resolve_filter};

use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::models::{Cart, NewCartItem};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantities must be positive and fit in a line.
    #[error("quantity must be between 1 and 2147483647")]
    InvalidQuantity,

    /// The cart or the line item does not exist.
    #[error("cart item not found")]
    NotFound,

    /// The product does not exist or is not visible to the caller.
    #[error("product not found")]
    ProductNotFound,

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CartError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::OutOfRange(_) => Self::InvalidQuantity,
            other => Self::Repository(other),
        }
    }
}

/// Owns every write to carts except order-placement cleanup.
#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
}

impl CartService {
    #[must_use]
    pub fn new(carts: Arc<dyn CartRepository>, products: Arc<dyn ProductRepository>) -> Self {
        Self { carts, products }
    }

    /// The stored cart, if any.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage fails.
    pub async fn get_cart(
        &self,
        buyer: AccountId,
        seller: AccountId,
    ) -> Result<Option<Cart>, CartError> {
        Ok(self.carts.find(buyer, seller).await?)
    }

    /// The stored cart, or an unsaved empty one.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage fails.
    pub async fn view(&self, buyer: AccountId, seller: AccountId) -> Result<Cart, CartError> {
        Ok(self
            .get_cart(buyer, seller)
            .await?
            .unwrap_or_else(|| Cart::empty(buyer, seller)))
    }

    /// Add a catalog product to the caller's cart with its seller.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if the product is missing or
    /// outside the caller's product scope, `CartError::InvalidQuantity` for a
    /// zero quantity.
    pub async fn add_product(
        &self,
        claims: &Claims,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        let predicate = resolve_filter(
            claims.role,
            claims.subject,
            &claims.associated_company_ids,
            Resource::Products,
        );
        let product = self
            .products
            .find_by_id(product_id)
            .await?
            .filter(|p| predicate.admits_product(p.seller_id))
            .ok_or(CartError::ProductNotFound)?;

        self.add_item(
            claims.subject,
            product.seller_id,
            NewCartItem {
                product_id: product.id,
                name: product.name,
                price: product.price,
                quantity,
            },
        )
        .await
    }

    /// Add `item.quantity` to the product's line, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a zero quantity.
    pub async fn add_item(
        &self,
        buyer: AccountId,
        seller: AccountId,
        item: NewCartItem,
    ) -> Result<Cart, CartError> {
        if item.quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        Ok(self.carts.add_item(buyer, seller, item).await?)
    }

    /// Replace a line's quantity; zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` if the cart or line is absent.
    pub async fn set_item_quantity(
        &self,
        buyer: AccountId,
        seller: AccountId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        if quantity == 0 {
            return self.remove_item(buyer, seller, item_id).await;
        }
        Ok(self
            .carts
            .set_item_quantity(buyer, seller, item_id, quantity)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `CartError::NotFound` if the cart or line is absent.
    pub async fn remove_item(
        &self,
        buyer: AccountId,
        seller: AccountId,
        item_id: CartItemId,
    ) -> Result<Cart, CartError> {
        Ok(self.carts.remove_item(buyer, seller, item_id).await?)
    }

    /// Empty the cart. Clearing a cart that was never saved succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage fails.
    pub async fn clear(&self, buyer: AccountId, seller: AccountId) -> Result<Cart, CartError> {
        Ok(self.carts.clear(buyer, seller).await?)
    }

    /// Upsert a whole cart; the total is recomputed from its items.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage fails.
    pub async fn save(&self, cart: &Cart) -> Result<Cart, CartError> {
        Ok(self.carts.save(cart).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use business_cart_core::{Money, Role};

    use super::*;
    use crate::db::Repositories;
    use crate::models::{MAX_LINE_QUANTITY, NewProduct};

    fn service(repos: &Repositories) -> CartService {
        CartService::new(repos.carts.clone(), repos.products.clone())
    }

    fn item(product_id: ProductId, cents: i64, quantity: u32) -> NewCartItem {
        NewCartItem {
            product_id,
            name: "Widget".into(),
            price: Money::from_cents(cents),
            quantity,
        }
    }

    fn claims(role: Role, associated: Vec<AccountId>) -> Claims {
        Claims {
            subject: AccountId::generate(),
            role,
            company_id: None,
            associated_company_ids: associated,
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_repeated_adds_sum_and_total_tracks() {
        let repos = Repositories::in_memory();
        let carts = service(&repos);
        let (buyer, seller) = (AccountId::generate(), AccountId::generate());
        let product = ProductId::generate();

        let mut expected = 0;
        for quantity in [2, 5, 1] {
            expected += quantity;
            let cart = carts
                .add_item(buyer, seller, item(product, 1000, quantity))
                .await
                .unwrap();
            assert_eq!(cart.items.len(), 1);
            assert_eq!(cart.items[0].quantity, expected);
            assert_eq!(cart.total_price, cart.computed_total());
        }
    }

    #[tokio::test]
    async fn test_zero_quantity_add_is_rejected() {
        let repos = Repositories::in_memory();
        let result = service(&repos)
            .add_item(
                AccountId::generate(),
                AccountId::generate(),
                item(ProductId::generate(), 100, 0),
            )
            .await;
        assert!(matches!(result, Err(CartError::InvalidQuantity)));
    }

    #[tokio::test]
    async fn test_overflowing_quantity_is_rejected() {
        let repos = Repositories::in_memory();
        let carts = service(&repos);
        let (buyer, seller) = (AccountId::generate(), AccountId::generate());
        let product = ProductId::generate();

        let cart = carts
            .add_item(buyer, seller, item(product, 100, u32::MAX - 1))
            .await;
        assert!(matches!(cart, Err(CartError::InvalidQuantity)));

        let cart = carts
            .add_item(buyer, seller, item(product, 100, MAX_LINE_QUANTITY))
            .await
            .unwrap();
        let result = carts.add_item(buyer, seller, item(product, 100, 1)).await;
        assert!(matches!(result, Err(CartError::InvalidQuantity)));

        let line = cart.items[0].id;
        let result = carts
            .set_item_quantity(buyer, seller, line, u32::MAX)
            .await;
        assert!(matches!(result, Err(CartError::InvalidQuantity)));
        let cart = carts.view(buyer, seller).await.unwrap();
        assert_eq!(cart.items[0].quantity, MAX_LINE_QUANTITY);
    }

    #[tokio::test]
    async fn test_setting_zero_quantity_removes_line() {
        let repos = Repositories::in_memory();
        let carts = service(&repos);
        let (buyer, seller) = (AccountId::generate(), AccountId::generate());
        carts
            .add_item(buyer, seller, item(ProductId::generate(), 1000, 2))
            .await
            .unwrap();
        let cart = carts
            .add_item(buyer, seller, item(ProductId::generate(), 500, 1))
            .await
            .unwrap();
        let first = cart.items[0].id;

        let cart = carts.set_item_quantity(buyer, seller, first, 0).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total_price, Money::from_cents(500));
    }

    #[tokio::test]
    async fn test_unknown_item_is_not_found() {
        let repos = Repositories::in_memory();
        let carts = service(&repos);
        let (buyer, seller) = (AccountId::generate(), AccountId::generate());
        carts
            .add_item(buyer, seller, item(ProductId::generate(), 1000, 1))
            .await
            .unwrap();

        let result = carts
            .set_item_quantity(buyer, seller, CartItemId::generate(), 3)
            .await;
        assert!(matches!(result, Err(CartError::NotFound)));
        let result = carts.remove_item(buyer, seller, CartItemId::generate()).await;
        assert!(matches!(result, Err(CartError::NotFound)));
    }

    #[tokio::test]
    async fn test_view_synthesizes_empty_cart() {
        let repos = Repositories::in_memory();
        let carts = service(&repos);
        let (buyer, seller) = (AccountId::generate(), AccountId::generate());

        assert!(carts.get_cart(buyer, seller).await.unwrap().is_none());
        let cart = carts.view(buyer, seller).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total_price, Money::ZERO);
    }

    #[tokio::test]
    async fn test_add_product_uses_catalog_price_and_scope() {
        let repos = Repositories::in_memory();
        let carts = service(&repos);
        let seller = AccountId::generate();
        let product = repos
            .products
            .create(NewProduct {
                seller_id: seller,
                name: "Crate of limes".into(),
                description: String::new(),
                price: Money::new(Decimal::new(1250, 2)),
            })
            .await
            .unwrap();

        let outsider = claims(Role::Customer, vec![AccountId::generate()]);
        let result = carts.add_product(&outsider, product.id, 1).await;
        assert!(matches!(result, Err(CartError::ProductNotFound)));

        let buyer = claims(Role::Customer, vec![seller]);
        let cart = carts.add_product(&buyer, product.id, 2).await.unwrap();
        assert_eq!(cart.seller_id, seller);
        assert_eq!(cart.buyer_id, buyer.subject);
        assert_eq!(cart.items[0].name, "Crate of limes");
        assert_eq!(cart.total_price, Money::from_cents(2500));
    }
}
