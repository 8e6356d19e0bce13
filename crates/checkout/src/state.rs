//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::CheckoutConfig;
use crate::db::Repositories;
use crate::services::{
    AuthService, CartService, Catalog, OrderLedger, PaymentGateway, QuoteEngine, TokenIssuer,
};

/// Application state shared across all handlers.
///
/// Built once at startup from a configuration, a set of repositories and a
/// payment gateway. Tests build one per case; nothing is global.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: CheckoutConfig,
    repos: Repositories,
    auth: AuthService,
    catalog: Catalog,
    carts: CartService,
    quotes: QuoteEngine,
    orders: OrderLedger,
}

impl AppState {
    /// Wire every service to the given repositories.
    #[must_use]
    pub fn new(
        config: CheckoutConfig,
        repos: Repositories,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        let tokens = Arc::new(TokenIssuer::new(&config.jwt, repos.tokens.clone()));
        let auth = AuthService::new(repos.accounts.clone(), repos.codes.clone(), tokens);
        let catalog = Catalog::new(repos.products.clone(), repos.accounts.clone());
        let carts = CartService::new(repos.carts.clone(), repos.products.clone());
        let quotes = QuoteEngine::new(repos.carts.clone(), repos.quotes.clone());
        let orders = OrderLedger::new(
            repos.quotes.clone(),
            repos.carts.clone(),
            repos.orders.clone(),
            payments,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                repos,
                auth,
                catalog,
                carts,
                quotes,
                orders,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CheckoutConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn repos(&self) -> &Repositories {
        &self.inner.repos
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn carts(&self) -> &CartService {
        &self.inner.carts
    }

    #[must_use]
    pub fn quotes(&self) -> &QuoteEngine {
        &self.inner.quotes
    }

    #[must_use]
    pub fn orders(&self) -> &OrderLedger {
        &self.inner.orders
    }
}
