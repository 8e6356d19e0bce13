//! Business logic for the checkout service.
//!
//! Services own the rules; repositories only persist. Each service holds the
//! repository trait objects it needs and is built once at startup.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod payment;
pub mod quote;

pub use auth::{AuthError, AuthService, Registration, TokenIssuer, TokenPair};
pub use cart::{CartError, CartService};
pub use catalog::{Catalog, CatalogError, ProductDraft};
pub use orders::{OrderError, OrderLedger, ReconcileReport};
pub use payment::{PaymentError, PaymentGateway, StubGateway};
pub use quote::{QuoteEngine, QuoteError};
