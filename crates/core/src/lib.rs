//! Business Cart Core - Shared domain types.
//!
//! This crate provides the types every Business Cart component agrees on:
//! - `checkout` - HTTP service for accounts, catalog, carts, quotes and orders
//! - `cli` - Command-line tools for migrations and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Access scoping and quote pricing live here because every
//! read path and every checkout path must agree on them.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, emails, roles and signed-credential claims
//! - [`scope`] - Role-to-visibility resolution for accounts, products and orders
//! - [`pricing`] - Quote totals (tax, shipping, grand total) and quote lifetime

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod scope;
pub mod types;

pub use pricing::{QUOTE_TTL_HOURS, Totals};
pub use scope::{Predicate, Resource, resolve_filter};
pub use types::*;
