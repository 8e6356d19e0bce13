//! HTTP middleware stack for the checkout service.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (accept or generate `x-request-id`, recorded on the span)
//! 4. `TimeoutLayer` (per-request budget)
//! 5. Rate limiting on the account endpoints (governor)
//!
//! Authentication is not a layer: handlers opt in through the extractors in
//! [`auth`].

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{AccessToken, RequireAdmin, RequireAuth, bearer_token};
pub use rate_limit::auth_rate_limiter;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
