//! Business Cart checkout service library.
//!
//! Accounts, onboarding codes, the product catalog and the Cart → Quote →
//! Order lifecycle, exposed over HTTP. The crate is a library so the router can
//! be built against any storage backend and exercised in tests without a
//! network or database.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
