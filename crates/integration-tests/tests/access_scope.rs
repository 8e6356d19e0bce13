//! Role-scoped visibility of accounts, products and orders.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use business_cart_integration_tests::TestContext;

fn ids(body: &Value) -> Vec<String> {
    let mut ids: Vec<String> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap().to_owned())
        .collect();
    ids.sort();
    ids
}

fn sorted(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids
}

#[tokio::test]
async fn test_product_and_account_visibility() {
    let ctx = TestContext::new();
    let admin = ctx.admin().await;
    ctx.issue_code(&admin, "ACME").await;
    ctx.issue_code(&admin, "GLOBEX").await;
    ctx.issue_code(&admin, "INITECH").await;

    let (acme_id, acme) = ctx.company("ACME").await;
    let (globex_id, globex) = ctx.company("GLOBEX").await;
    let (_, initech) = ctx.company("INITECH").await;
    let acme_widget = ctx.product(&acme, "Widget", "10.00").await;
    let globex_gizmo = ctx.product(&globex, "Gizmo", "7.50").await;
    let initech_stapler = ctx.product(&initech, "Stapler", "3.00").await;

    let (both_id, both) = ctx
        .customer("both@shop.test", &["ACME-CU", "GLOBEX-CU"])
        .await;
    let (loyal_id, loyal) = ctx.customer("loyal@shop.test", &["ACME-CU"]).await;

    // Customers see products of their companies only.
    let products = ctx.get("/products", &both).await;
    assert_eq!(
        ids(&products.body),
        sorted(vec![acme_widget.clone(), globex_gizmo.clone()])
    );
    let hidden = ctx
        .get(&format!("/products/{initech_stapler}"), &both)
        .await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);

    // Companies see their own listings.
    assert_eq!(ids(&ctx.get("/products", &acme).await.body), vec![acme_widget]);

    // Admins see everything.
    assert_eq!(ctx.get("/products", &admin).await.body.as_array().unwrap().len(), 3);

    // A company sees itself and its customers, never other companies.
    let accounts = ctx.get("/accounts", &acme).await;
    assert_eq!(
        ids(&accounts.body),
        sorted(vec![acme_id.clone(), both_id.clone(), loyal_id.clone()])
    );
    let accounts = ctx.get("/accounts", &globex).await;
    assert_eq!(ids(&accounts.body), sorted(vec![globex_id, both_id.clone()]));

    // Customers see only themselves.
    assert_eq!(ids(&ctx.get("/accounts", &loyal).await.body), vec![loyal_id]);
    let other = ctx.get(&format!("/accounts/{both_id}"), &loyal).await;
    assert_eq!(other.status, StatusCode::NOT_FOUND);
    let company = ctx.get(&format!("/accounts/{acme_id}"), &both).await;
    assert_eq!(company.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cannot_buy_outside_associations() {
    let ctx = TestContext::new();
    let admin = ctx.admin().await;
    ctx.issue_code(&admin, "ACME").await;
    ctx.issue_code(&admin, "GLOBEX").await;
    let (_, globex) = ctx.company("GLOBEX").await;
    let gizmo = ctx.product(&globex, "Gizmo", "7.50").await;
    let (_, buyer) = ctx.customer("buyer@shop.test", &["ACME-CU"]).await;

    let response = ctx
        .post(
            "/cart",
            Some(&buyer),
            json!({ "productId": gizmo, "quantity": 1 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_orders_are_buyer_scoped_for_customers() {
    let ctx = TestContext::new();
    let admin = ctx.admin().await;
    ctx.issue_code(&admin, "ACME").await;
    let (acme_id, acme) = ctx.company("ACME").await;
    let widget = ctx.product(&acme, "Widget", "10.00").await;
    let (_, alice) = ctx.customer("alice@shop.test", &["ACME-CU"]).await;
    let (_, bob) = ctx.customer("bob@shop.test", &["ACME-CU"]).await;

    let mut placed = Vec::new();
    for buyer in [&alice, &bob] {
        ctx.post(
            "/cart",
            Some(buyer),
            json!({ "productId": widget, "quantity": 1 }),
        )
        .await;
        let quote = ctx
            .post("/quotes", Some(buyer), json!({ "companyId": acme_id }))
            .await;
        let order = ctx
            .post(
                "/orders",
                Some(buyer),
                json!({ "quoteId": quote.body["id"], "paymentToken": "tok_stripe_valid" }),
            )
            .await;
        assert_eq!(order.status, StatusCode::OK);
        placed.push(order.body["id"].as_str().unwrap().to_owned());
    }

    assert_eq!(ids(&ctx.get("/orders", &alice).await.body), vec![placed[0].clone()]);
    assert_eq!(ids(&ctx.get("/orders", &bob).await.body), vec![placed[1].clone()]);
    assert_eq!(ids(&ctx.get("/orders", &acme).await.body), sorted(placed.clone()));
    assert_eq!(ids(&ctx.get("/orders", &admin).await.body), sorted(placed.clone()));

    let peek = ctx.get(&format!("/orders/{}", placed[1]), &alice).await;
    assert_eq!(peek.status, StatusCode::NOT_FOUND);

    // Only the seller (or an admin) may remove a listing.
    let delete = ctx
        .send(Method::DELETE, &format!("/products/{widget}"), Some(&alice), None)
        .await;
    assert_eq!(delete.status, StatusCode::FORBIDDEN);
    let delete = ctx
        .send(Method::DELETE, &format!("/products/{widget}"), Some(&acme), None)
        .await;
    assert_eq!(delete.status, StatusCode::NO_CONTENT);
}
