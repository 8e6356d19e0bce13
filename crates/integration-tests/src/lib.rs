//! Integration tests for Business Cart.
//!
//! Every test builds its own router over a fresh in-memory store and drives it
//! with `tower::ServiceExt::oneshot`, so no database, network or running
//! server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p business-cart-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use business_cart_checkout::config::{CheckoutConfig, JwtConfig};
use business_cart_checkout::db::Repositories;
use business_cart_checkout::models::{AccountProfile, NewAccount};
use business_cart_checkout::routes;
use business_cart_checkout::services::auth::hash_password;
use business_cart_checkout::services::{PaymentGateway, StubGateway};
use business_cart_checkout::state::AppState;
use business_cart_core::{AccountId, AccountStatus, Email};

/// Password used for every account the harness creates.
pub const PASSWORD: &str = "correct horse battery";

const MAX_BODY: usize = 1024 * 1024;

/// A response as the tests see it.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// An isolated checkout instance.
pub struct TestContext {
    pub repos: Repositories,
    app: Router,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    /// A fresh instance using the stub payment gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::with_gateway(Arc::new(StubGateway))
    }

    /// A fresh instance using `payments`.
    #[must_use]
    pub fn with_gateway(payments: Arc<dyn PaymentGateway>) -> Self {
        let config = CheckoutConfig::for_memory(JwtConfig {
            access_secret: SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%"),
            refresh_secret: SecretString::from("Zq8#Lm1!Rt6@Vx3$Np9&Ks2*Hd7^Wf4%"),
        });
        let repos = Repositories::in_memory();
        let state = AppState::new(config, repos.clone(), payments);
        Self {
            repos,
            app: routes::app(state),
        }
    }

    /// Send one request.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), MAX_BODY).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        TestResponse { status, body }
    }

    pub async fn get(&self, path: &str, token: &str) -> TestResponse {
        self.send(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, path, token, Some(body)).await
    }

    /// Create an admin directly in storage and log in.
    pub async fn admin(&self) -> String {
        let email = format!("admin-{}@platform.test", uuid::Uuid::new_v4());
        self.repos
            .accounts
            .create(
                NewAccount {
                    id: AccountId::generate(),
                    name: "Ops".into(),
                    email: Email::parse(&email).unwrap(),
                    password_hash: hash_password(PASSWORD).unwrap(),
                    status: AccountStatus::Active,
                    profile: AccountProfile::Admin,
                },
                None,
            )
            .await
            .unwrap();
        self.login(&email).await
    }

    /// Log in and return the access token.
    pub async fn login(&self, email: &str) -> String {
        let response = self
            .post(
                "/accounts/login",
                None,
                json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.body["accessToken"].as_str().unwrap().to_owned()
    }

    /// Issue a code document through the admin API.
    pub async fn issue_code(&self, admin: &str, prefix: &str) -> Value {
        let response = self
            .post(
                "/codes",
                Some(admin),
                json!({
                    "companyCode": format!("{prefix}-CO"),
                    "customerCode": format!("{prefix}-CU"),
                    "partnerCode": format!("{prefix}-PA"),
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body
    }

    /// Register an account and return `(account id, access token)`.
    pub async fn register(&self, body: Value) -> (String, String) {
        let email = body["email"].as_str().unwrap().to_owned();
        let response = self.post("/accounts/register", None, body).await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        let id = response.body["id"].as_str().unwrap().to_owned();
        (id, self.login(&email).await)
    }

    /// Register a company with `<prefix>-CO`.
    pub async fn company(&self, prefix: &str) -> (String, String) {
        self.register(json!({
            "name": format!("{prefix} Inc"),
            "email": format!("owner@{}.test", prefix.to_lowercase()),
            "password": PASSWORD,
            "role": "company",
            "code": format!("{prefix}-CO"),
        }))
        .await
    }

    /// Register a customer linked through the given customer codes.
    pub async fn customer(&self, email: &str, codes: &[&str]) -> (String, String) {
        self.register(json!({
            "name": "Buyer",
            "email": email,
            "password": PASSWORD,
            "role": "customer",
            "customerCodes": codes,
        }))
        .await
    }

    /// List a product as a company and return its id.
    pub async fn product(&self, company: &str, name: &str, price: &str) -> String {
        let response = self
            .post(
                "/products",
                Some(company),
                json!({ "name": name, "description": "", "price": price }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["id"].as_str().unwrap().to_owned()
    }
}
