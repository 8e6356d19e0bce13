//! Domain models for the checkout service.
//!
//! These are validated domain objects, separate from database row types.

pub mod account;
pub mod cart;
pub mod order;
pub mod product;
pub mod quote;

pub use account::{
    Account, AccountProfile, Code, CustomerCode, NewAccount, NewCode, ProfileStatus,
    RefreshTokenRecord,
};
pub use cart::{Cart, CartItem, MAX_LINE_QUANTITY, NewCartItem};
pub use order::{Order, PendingCleanup};
pub use product::{NewProduct, Product};
pub use quote::Quote;
