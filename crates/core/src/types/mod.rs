//! Core types for Business Cart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod claims;
pub mod email;
pub mod id;
pub mod money;
pub mod role;

pub use claims::Claims;
pub use email::{Email, EmailError};
pub use id::*;
pub use money::Money;
pub use role::*;
