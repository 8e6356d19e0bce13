//! Process-local storage.
//!
//! All collections live behind one `RwLock`; every trait method takes the lock
//! once, so each write is atomic with respect to every other.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use business_cart_core::{
    AccountId, CartItemId, CodeId, Email, OrderId, Predicate, ProductId, QuoteId,
};

use super::{
    AccountRepository, CartRepository, CodeRepository, OrderRepository, ProductRepository,
    QuoteRepository, RepositoryError, StoreHealth, TokenRepository,
};
use crate::models::{
    Account, Cart, CartItem, Code, MAX_LINE_QUANTITY, NewAccount, NewCartItem, NewCode,
    NewProduct, Order, PendingCleanup, Product, Quote, RefreshTokenRecord,
};

type CartKey = (AccountId, AccountId);

#[derive(Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    codes: HashMap<CodeId, Code>,
    code_values: HashMap<String, CodeId>,
    refresh_tokens: HashMap<Uuid, RefreshTokenRecord>,
    blacklist: HashMap<Uuid, DateTime<Utc>>,
    products: HashMap<ProductId, Product>,
    carts: HashMap<CartKey, Cart>,
    quotes: HashMap<QuoteId, Quote>,
    orders: HashMap<OrderId, Order>,
    orders_by_quote: HashMap<QuoteId, OrderId>,
    cleanups: HashMap<QuoteId, PendingCleanup>,
}

/// In-memory implementation of every repository trait.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn line_quantity(quantity: Option<u32>) -> Result<u32, RepositoryError> {
    quantity
        .filter(|q| *q <= MAX_LINE_QUANTITY)
        .ok_or_else(|| RepositoryError::OutOfRange("cart line quantity".to_owned()))
}

fn touch(cart: &mut Cart) -> Cart {
    cart.recompute_total();
    cart.updated_at = Utc::now();
    cart.clone()
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn create(
        &self,
        account: NewAccount,
        claim: Option<CodeId>,
    ) -> Result<Account, RepositoryError> {
        let mut tables = self.tables.write().await;

        if tables.accounts.contains_key(&account.id) {
            return Err(RepositoryError::Conflict("account id already exists".to_owned()));
        }
        if tables.accounts.values().any(|a| a.email == account.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        if let Some(code_id) = claim {
            match tables.codes.get_mut(&code_id) {
                Some(code) if !code.is_claimed => code.is_claimed = true,
                _ => return Err(RepositoryError::Stale("code is not claimable".to_owned())),
            }
        }

        let now = Utc::now();
        let account = Account {
            id: account.id,
            name: account.name,
            email: account.email,
            password_hash: account.password_hash,
            role: account.profile.role(),
            status: account.status,
            profile: account.profile,
            created_at: now,
            updated_at: now,
        };
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.values().find(|a| &a.email == email).cloned())
    }

    async fn list(&self, predicate: &Predicate) -> Result<Vec<Account>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut accounts: Vec<Account> = tables
            .accounts
            .values()
            .filter(|a| predicate.admits_account(a.id, &a.profile.associated_company_ids()))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(accounts)
    }
}

#[async_trait]
impl CodeRepository for MemoryStore {
    async fn create(&self, code: NewCode) -> Result<Code, RepositoryError> {
        let mut tables = self.tables.write().await;

        let mut seen = Vec::new();
        for value in code.values() {
            if tables.code_values.contains_key(value) || seen.contains(&value) {
                return Err(RepositoryError::Conflict(format!("code '{value}' already exists")));
            }
            seen.push(value);
        }

        let code = Code {
            id: CodeId::generate(),
            company_code: code.company_code,
            customer_code: code.customer_code,
            partner_code: code.partner_code,
            is_claimed: false,
            created_at: Utc::now(),
        };
        for value in code.values() {
            tables.code_values.insert(value.to_owned(), code.id);
        }
        tables.codes.insert(code.id, code.clone());
        Ok(code)
    }

    async fn find_by_value(&self, value: &str) -> Result<Option<Code>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .code_values
            .get(value)
            .and_then(|id| tables.codes.get(id))
            .cloned())
    }
}

#[async_trait]
impl TokenRepository for MemoryStore {
    async fn store_refresh(&self, record: RefreshTokenRecord) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.refresh_tokens.insert(record.token_id, record);
        Ok(())
    }

    async fn take_refresh(
        &self,
        token_id: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, RepositoryError> {
        Ok(self.tables.write().await.refresh_tokens.remove(&token_id))
    }

    async fn blacklist(
        &self,
        token_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.blacklist.entry(token_id).or_insert(expires_at);
        Ok(())
    }

    async fn is_blacklisted(&self, token_id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.tables.read().await.blacklist.contains_key(&token_id))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut tables = self.tables.write().await;
        let before = tables.refresh_tokens.len() + tables.blacklist.len();
        tables.refresh_tokens.retain(|_, r| r.expires_at > now);
        tables.blacklist.retain(|_, expires_at| *expires_at > now);
        let after = tables.refresh_tokens.len() + tables.blacklist.len();
        Ok(u64::try_from(before - after).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let product = Product {
            id: ProductId::generate(),
            seller_id: product.seller_id,
            name: product.name,
            description: product.description,
            price: product.price,
            created_at: Utc::now(),
        };
        let mut tables = self.tables.write().await;
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn list(&self, predicate: &Predicate) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut products: Vec<Product> = tables
            .products
            .values()
            .filter(|p| predicate.admits_product(p.seller_id))
            .cloned()
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        Ok(self.tables.write().await.products.remove(&id).is_some())
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn find(
        &self,
        buyer: AccountId,
        seller: AccountId,
    ) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.tables.read().await.carts.get(&(buyer, seller)).cloned())
    }

    async fn add_item(
        &self,
        buyer: AccountId,
        seller: AccountId,
        item: NewCartItem,
    ) -> Result<Cart, RepositoryError> {
        let mut tables = self.tables.write().await;
        let existing = tables.carts.get(&(buyer, seller)).and_then(|cart| {
            cart.items
                .iter()
                .find(|line| line.product_id == item.product_id)
                .map(|line| line.quantity)
        });
        let quantity = line_quantity(match existing {
            Some(current) => current.checked_add(item.quantity),
            None => Some(item.quantity),
        })?;

        let cart = tables
            .carts
            .entry((buyer, seller))
            .or_insert_with(|| Cart::empty(buyer, seller));
        match cart.items.iter_mut().find(|line| line.product_id == item.product_id) {
            Some(line) => line.quantity = quantity,
            None => cart.items.push(CartItem {
                id: CartItemId::generate(),
                product_id: item.product_id,
                name: item.name,
                price: item.price,
                quantity,
            }),
        }
        Ok(touch(cart))
    }

    async fn set_item_quantity(
        &self,
        buyer: AccountId,
        seller: AccountId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<Cart, RepositoryError> {
        let quantity = line_quantity(Some(quantity))?;
        let mut tables = self.tables.write().await;
        let cart = tables
            .carts
            .get_mut(&(buyer, seller))
            .ok_or(RepositoryError::NotFound)?;
        let line = cart
            .items
            .iter_mut()
            .find(|line| line.id == item_id)
            .ok_or(RepositoryError::NotFound)?;
        line.quantity = quantity;
        Ok(touch(cart))
    }

    async fn remove_item(
        &self,
        buyer: AccountId,
        seller: AccountId,
        item_id: CartItemId,
    ) -> Result<Cart, RepositoryError> {
        let mut tables = self.tables.write().await;
        let cart = tables
            .carts
            .get_mut(&(buyer, seller))
            .ok_or(RepositoryError::NotFound)?;
        let before = cart.items.len();
        cart.items.retain(|line| line.id != item_id);
        if cart.items.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(touch(cart))
    }

    async fn clear(&self, buyer: AccountId, seller: AccountId) -> Result<Cart, RepositoryError> {
        let mut tables = self.tables.write().await;
        let cart = tables
            .carts
            .entry((buyer, seller))
            .or_insert_with(|| Cart::empty(buyer, seller));
        cart.items.clear();
        Ok(touch(cart))
    }

    async fn save(&self, cart: &Cart) -> Result<Cart, RepositoryError> {
        let mut tables = self.tables.write().await;
        let key = (cart.buyer_id, cart.seller_id);
        let id = tables.carts.get(&key).map_or(cart.id, |existing| existing.id);
        let stored = tables.carts.entry(key).or_insert_with(|| cart.clone());
        *stored = Cart { id, ..cart.clone() };
        Ok(touch(stored))
    }
}

#[async_trait]
impl QuoteRepository for MemoryStore {
    async fn insert(&self, quote: &Quote) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.quotes.contains_key(&quote.id) {
            return Err(RepositoryError::Conflict("quote already exists".to_owned()));
        }
        tables.quotes.insert(quote.id, quote.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: QuoteId) -> Result<Option<Quote>, RepositoryError> {
        Ok(self.tables.read().await.quotes.get(&id).cloned())
    }

    async fn delete(&self, id: QuoteId) -> Result<bool, RepositoryError> {
        Ok(self.tables.write().await.quotes.remove(&id).is_some())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert_with_cleanup(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.orders_by_quote.contains_key(&order.quote_id) {
            return Err(RepositoryError::Conflict("quote already ordered".to_owned()));
        }
        tables.orders_by_quote.insert(order.quote_id, order.id);
        tables.cleanups.insert(order.quote_id, order.cleanup());
        tables.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn find_by_quote(&self, quote_id: QuoteId) -> Result<Option<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders_by_quote
            .get(&quote_id)
            .and_then(|id| tables.orders.get(id))
            .cloned())
    }

    async fn list(&self, predicate: &Predicate) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| predicate.admits_order(o.seller_id, o.buyer_id))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn pending_cleanup(
        &self,
        quote_id: QuoteId,
    ) -> Result<Option<PendingCleanup>, RepositoryError> {
        Ok(self.tables.read().await.cleanups.get(&quote_id).copied())
    }

    async fn pending_cleanups(&self, limit: u32) -> Result<Vec<PendingCleanup>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut pending: Vec<PendingCleanup> = tables.cleanups.values().copied().collect();
        pending.sort_by_key(|c| c.created_at);
        pending.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(pending)
    }

    async fn complete_cleanup(&self, quote_id: QuoteId) -> Result<(), RepositoryError> {
        self.tables.write().await.cleanups.remove(&quote_id);
        Ok(())
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
