//! HTTP route handlers for the checkout service.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                     - Liveness
//! GET    /health/ready               - Storage readiness
//!
//! # Accounts
//! POST   /accounts/register          - Register with an onboarding code (rate limited)
//! POST   /accounts/login             - Email + password -> token pair (rate limited)
//! POST   /accounts/refresh           - Rotate a refresh token (rate limited)
//! POST   /accounts/logout            - Revoke the bearer token
//! GET    /accounts                   - Scoped account list
//! GET    /accounts/{id}              - One visible account
//!
//! # Codes (admin)
//! POST   /codes                      - Issue a code document
//! GET    /codes/{code}               - Look up by any code value
//!
//! # Products
//! POST   /products                   - List a product
//! GET    /products                   - Scoped product list
//! GET    /products/{id}              - One visible product
//! DELETE /products/{id}              - Remove a listing
//!
//! # Cart (?companyId= names the seller)
//! GET    /cart                       - The caller's cart with that seller
//! POST   /cart                       - Add a product
//! DELETE /cart                       - Clear
//! PUT    /cart/{itemId}              - Set a line's quantity (0 removes)
//! DELETE /cart/{itemId}              - Remove a line
//!
//! # Checkout
//! POST   /quotes                     - Quote the caller's cart with a seller
//! GET    /quotes/{id}                - Read an own quote
//! POST   /orders                     - Pay for a quote
//! GET    /orders                     - Scoped order list
//! GET    /orders/{id}                - One visible order
//! ```

pub mod accounts;
pub mod cart;
pub mod codes;
pub mod orders;
pub mod products;
pub mod quotes;

use axum::{
    Router,
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post, put},
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::field::Empty;

use crate::middleware::{auth_rate_limiter, request_id_middleware};
use crate::state::AppState;

/// Unauthenticated account routes.
pub fn public_account_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(accounts::register))
        .route("/login", post(accounts::login))
        .route("/refresh", post(accounts::refresh))
}

/// Authenticated account routes.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(accounts::index))
        .route("/logout", post(accounts::logout))
        .route("/{id}", get(accounts::show))
}

/// Onboarding code routes.
pub fn code_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(codes::create))
        .route("/{code}", get(codes::show))
}

/// Product routes.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/{id}", get(products::show).delete(products::delete))
}

/// Cart routes.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add).delete(cart::clear))
        .route("/{item_id}", put(cart::update).delete(cart::remove))
}

/// Quote routes.
pub fn quote_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(quotes::create))
        .route("/{id}", get(quotes::show))
}

/// Order routes.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/{id}", get(orders::show))
}

/// Create all routes for the checkout service.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    let mut public_accounts = public_account_routes();
    if rate_limit {
        public_accounts = public_accounts.layer(auth_rate_limiter());
    }

    Router::new()
        .nest("/accounts", public_accounts.merge(account_routes()))
        .nest("/codes", code_routes())
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/quotes", quote_routes())
        .nest("/orders", order_routes())
}

/// The complete application: routes, health checks and the middleware stack.
pub fn app(state: AppState) -> Router {
    let timeout = state.config().request_timeout;
    let rate_limit = state.config().rate_limit;

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes(rate_limit))
        .with_state(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            let route = request
                .extensions()
                .get::<MatchedPath>()
                .map_or_else(|| request.uri().path(), MatchedPath::as_str);
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                route,
                request_id = Empty,
                account_id = Empty,
            )
        }))
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if storage is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.repos().health.ping().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
