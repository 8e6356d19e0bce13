//! Registration, codes and the token lifecycle over HTTP.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use business_cart_integration_tests::{PASSWORD, TestContext};

#[tokio::test]
async fn test_codes_are_admin_only_and_unique() {
    let ctx = TestContext::new();
    let admin = ctx.admin().await;
    ctx.issue_code(&admin, "ACME").await;

    let duplicate = ctx
        .post(
            "/codes",
            Some(&admin),
            json!({ "companyCode": "NEW-CO", "customerCode": "ACME-PA" }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let blank = ctx
        .post(
            "/codes",
            Some(&admin),
            json!({ "companyCode": " ", "customerCode": "X" }),
        )
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let found = ctx.get("/codes/ACME-CU", &admin).await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(found.body["companyCode"], "ACME-CO");
    assert_eq!(found.body["isClaimed"], false);

    let (_, company) = ctx.company("ACME").await;
    let forbidden = ctx
        .post(
            "/codes",
            Some(&company),
            json!({ "companyCode": "Z-CO", "customerCode": "Z-CU" }),
        )
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let anonymous = ctx
        .post(
            "/codes",
            None,
            json!({ "companyCode": "Z-CO", "customerCode": "Z-CU" }),
        )
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let claimed = ctx.get("/codes/ACME-CO", &admin).await;
    assert_eq!(claimed.body["isClaimed"], true);
}

#[tokio::test]
async fn test_registration_rules() {
    let ctx = TestContext::new();
    let admin = ctx.admin().await;
    let code = ctx.issue_code(&admin, "ACME").await;

    let (company_id, _) = ctx.company("ACME").await;
    assert_eq!(company_id, code["id"].as_str().unwrap());

    let cases = [
        json!({ "name": "A", "email": "a@x.test", "password": PASSWORD, "role": "admin" }),
        json!({ "name": "A", "email": "a@x.test", "password": PASSWORD, "role": "wizard" }),
        json!({ "name": "A", "email": "a@x.test", "password": PASSWORD, "role": "company",
                "code": "ACME-CO" }),
        json!({ "name": "A", "email": "a@x.test", "password": PASSWORD, "role": "customer" }),
        json!({ "name": "A", "email": "a@x.test", "password": PASSWORD, "role": "customer",
                "customerCodes": ["NOPE"] }),
        json!({ "name": "A", "email": "a@x.test", "password": "short", "role": "partner" }),
        json!({ "name": "A", "email": "not-an-email", "password": PASSWORD, "role": "partner" }),
    ];
    for body in cases {
        let response = ctx.post("/accounts/register", None, body.clone()).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{body}");
    }

    let taken = ctx
        .post(
            "/accounts/register",
            None,
            json!({ "name": "B", "email": "OWNER@acme.test", "password": PASSWORD,
                    "role": "partner" }),
        )
        .await;
    assert_eq!(taken.status, StatusCode::CONFLICT);

    let response = ctx
        .post(
            "/accounts/register",
            None,
            json!({ "name": "P", "email": "p@agency.test", "password": PASSWORD,
                    "role": "partner" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert!(response.body.get("passwordHash").is_none());
    assert_eq!(response.body["profile"]["kind"], "partner");
}

#[tokio::test]
async fn test_login_refresh_logout() {
    let ctx = TestContext::new();
    ctx.post(
        "/accounts/register",
        None,
        json!({ "name": "P", "email": "p@agency.test", "password": PASSWORD, "role": "partner" }),
    )
    .await;

    let wrong = ctx
        .post(
            "/accounts/login",
            None,
            json!({ "email": "p@agency.test", "password": "nope nope nope" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let login = ctx
        .post(
            "/accounts/login",
            None,
            json!({ "email": "p@agency.test", "password": PASSWORD }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let refresh = login.body["refreshToken"].as_str().unwrap().to_owned();

    let rotated = ctx
        .post("/accounts/refresh", None, json!({ "refreshToken": refresh }))
        .await;
    assert_eq!(rotated.status, StatusCode::OK);
    let reused = ctx
        .post("/accounts/refresh", None, json!({ "refreshToken": refresh }))
        .await;
    assert_eq!(reused.status, StatusCode::UNAUTHORIZED);

    let access = rotated.body["accessToken"].as_str().unwrap().to_owned();
    assert_eq!(ctx.get("/orders", &access).await.status, StatusCode::OK);

    let logout = ctx
        .send(Method::POST, "/accounts/logout", Some(&access), None)
        .await;
    assert_eq!(logout.status, StatusCode::NO_CONTENT);

    let after = ctx.get("/orders", &access).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert!(after.body["error"].is_string());

    let garbage = ctx.get("/orders", "not-a-token").await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    let none = ctx.send(Method::GET, "/orders", None, None).await;
    assert_eq!(none.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_endpoints() {
    let ctx = TestContext::new();
    let health = ctx.send(Method::GET, "/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);
    let ready = ctx.send(Method::GET, "/health/ready", None, None).await;
    assert_eq!(ready.status, StatusCode::OK);
}
