//! Cart → Quote → Order over HTTP.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use business_cart_integration_tests::TestContext;

fn amount(value: &Value) -> f64 {
    value.as_str().unwrap().parse().unwrap()
}

fn assert_amount(value: &Value, expected: f64) {
    assert!(
        (amount(value) - expected).abs() < 1e-9,
        "expected {expected}, got {value}"
    );
}

/// A company "ACME" with two products and a customer buying from it.
struct Shop {
    ctx: TestContext,
    company_id: String,
    company: String,
    buyer: String,
    widget: String,
    gadget: String,
}

async fn shop() -> Shop {
    let ctx = TestContext::new();
    let admin = ctx.admin().await;
    ctx.issue_code(&admin, "ACME").await;
    let (company_id, company) = ctx.company("ACME").await;
    let widget = ctx.product(&company, "Widget", "10.00").await;
    let gadget = ctx.product(&company, "Gadget", "5.00").await;
    let (_, buyer) = ctx.customer("buyer@shop.test", &["ACME-CU"]).await;
    Shop {
        ctx,
        company_id,
        company,
        buyer,
        widget,
        gadget,
    }
}

impl Shop {
    async fn add(&self, product: &str, quantity: u32) -> Value {
        let response = self
            .ctx
            .post(
                "/cart",
                Some(&self.buyer),
                json!({ "productId": product, "quantity": quantity }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.body
    }

    async fn cart(&self) -> Value {
        let response = self
            .ctx
            .get(&format!("/cart?companyId={}", self.company_id), &self.buyer)
            .await;
        assert_eq!(response.status, StatusCode::OK);
        response.body
    }

    async fn quote(&self) -> Value {
        let response = self
            .ctx
            .post(
                "/quotes",
                Some(&self.buyer),
                json!({ "companyId": self.company_id }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.body
    }
}

#[tokio::test]
async fn test_full_checkout() {
    let shop = shop().await;

    shop.add(&shop.widget, 1).await;
    shop.add(&shop.widget, 1).await;
    let cart = shop.add(&shop.gadget, 1).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 2);
    assert_amount(&cart["totalPrice"], 25.0);

    let quote = shop.quote().await;
    assert_amount(&quote["subtotal"], 25.0);
    assert_amount(&quote["taxAmount"], 2.0625);
    assert_amount(&quote["shippingCost"], 10.0);
    assert_amount(&quote["grandTotal"], 37.0625);

    let order = shop
        .ctx
        .post(
            "/orders",
            Some(&shop.buyer),
            json!({ "quoteId": quote["id"], "paymentToken": "tok_stripe_valid" }),
        )
        .await;
    assert_eq!(order.status, StatusCode::OK, "{:?}", order.body);
    assert_eq!(order.body["grandTotal"], quote["grandTotal"]);
    assert_eq!(order.body["items"], quote["items"]);
    assert_eq!(order.body["paymentMethod"], "stripe");
    assert!(
        order.body["transactionId"]
            .as_str()
            .unwrap()
            .starts_with("stripe_tx_")
    );

    // Cart emptied, quote retired.
    let cart = shop.cart().await;
    assert!(cart["items"].as_array().unwrap().is_empty());
    assert_amount(&cart["totalPrice"], 0.0);
    let gone = shop
        .ctx
        .get(&format!("/quotes/{}", quote["id"].as_str().unwrap()), &shop.buyer)
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);

    // Buyer and seller both see it; placing again returns the same order.
    let mine = shop.ctx.get("/orders", &shop.buyer).await;
    assert_eq!(mine.body.as_array().unwrap().len(), 1);
    let theirs = shop.ctx.get("/orders", &shop.company).await;
    assert_eq!(theirs.body.as_array().unwrap().len(), 1);

    // A retried placement must not touch the buyer's next cart.
    shop.add(&shop.gadget, 1).await;
    let again = shop
        .ctx
        .post(
            "/orders",
            Some(&shop.buyer),
            json!({ "quoteId": quote["id"], "paymentToken": "tok_stripe_valid" }),
        )
        .await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.body["id"], order.body["id"]);
    assert_eq!(shop.cart().await["items"].as_array().unwrap().len(), 1);

    let by_id = shop
        .ctx
        .get(
            &format!("/orders/{}", order.body["id"].as_str().unwrap()),
            &shop.company,
        )
        .await;
    assert_eq!(by_id.status, StatusCode::OK);
}

#[tokio::test]
async fn test_declined_payment_changes_nothing() {
    let shop = shop().await;
    shop.add(&shop.widget, 2).await;
    let quote = shop.quote().await;

    let declined = shop
        .ctx
        .post(
            "/orders",
            Some(&shop.buyer),
            json!({ "quoteId": quote["id"], "paymentToken": "tok_bogus" }),
        )
        .await;
    assert_eq!(declined.status, StatusCode::BAD_GATEWAY);
    assert!(declined.body["error"].is_string());

    // Amazon Pay's token is not valid for the default method.
    let wrong_method = shop
        .ctx
        .post(
            "/orders",
            Some(&shop.buyer),
            json!({ "quoteId": quote["id"], "paymentToken": "amz_pay_valid" }),
        )
        .await;
    assert_eq!(wrong_method.status, StatusCode::BAD_GATEWAY);

    assert!(
        shop.ctx
            .get("/orders", &shop.buyer)
            .await
            .body
            .as_array()
            .unwrap()
            .is_empty()
    );
    assert_eq!(shop.cart().await["items"].as_array().unwrap().len(), 1);
    let still_there = shop
        .ctx
        .get(&format!("/quotes/{}", quote["id"].as_str().unwrap()), &shop.buyer)
        .await;
    assert_eq!(still_there.status, StatusCode::OK);

    let paid = shop
        .ctx
        .post(
            "/orders",
            Some(&shop.buyer),
            json!({
                "quoteId": quote["id"],
                "paymentToken": "amz_pay_valid",
                "paymentMethod": "amazon_pay",
            }),
        )
        .await;
    assert_eq!(paid.status, StatusCode::OK);
    assert!(
        paid.body["transactionId"]
            .as_str()
            .unwrap()
            .starts_with("amazon_tx_")
    );
}

#[tokio::test]
async fn test_empty_and_missing_carts() {
    let shop = shop().await;

    let missing = shop
        .ctx
        .post(
            "/quotes",
            Some(&shop.buyer),
            json!({ "companyId": shop.company_id }),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    shop.add(&shop.widget, 1).await;
    let cleared = shop
        .ctx
        .send(
            Method::DELETE,
            &format!("/cart?companyId={}", shop.company_id),
            Some(&shop.buyer),
            None,
        )
        .await;
    assert_eq!(cleared.status, StatusCode::OK);

    let empty = shop
        .ctx
        .post(
            "/quotes",
            Some(&shop.buyer),
            json!({ "companyId": shop.company_id }),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_line_updates_and_removal() {
    let shop = shop().await;
    shop.add(&shop.widget, 1).await;
    let cart = shop.add(&shop.gadget, 3).await;
    let gadget_line = cart["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["productId"] == shop.gadget.as_str())
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_owned();

    let updated = shop
        .ctx
        .send(
            Method::PUT,
            &format!("/cart/{gadget_line}?companyId={}", shop.company_id),
            Some(&shop.buyer),
            Some(json!({ "quantity": 1 })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_amount(&updated.body["totalPrice"], 15.0);

    let removed = shop
        .ctx
        .send(
            Method::DELETE,
            &format!("/cart/{gadget_line}?companyId={}", shop.company_id),
            Some(&shop.buyer),
            None,
        )
        .await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_amount(&removed.body["totalPrice"], 10.0);

    let again = shop
        .ctx
        .send(
            Method::DELETE,
            &format!("/cart/{gadget_line}?companyId={}", shop.company_id),
            Some(&shop.buyer),
            None,
        )
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);

    let no_seller = shop.ctx.get("/cart", &shop.buyer).await;
    assert_eq!(no_seller.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_quotes_are_private_to_their_buyer() {
    let shop = shop().await;
    shop.add(&shop.widget, 1).await;
    let quote = shop.quote().await;
    let (_, other) = shop.ctx.customer("other@shop.test", &["ACME-CU"]).await;

    let peek = shop
        .ctx
        .get(&format!("/quotes/{}", quote["id"].as_str().unwrap()), &other)
        .await;
    assert_eq!(peek.status, StatusCode::FORBIDDEN);

    let steal = shop
        .ctx
        .post(
            "/orders",
            Some(&other),
            json!({ "quoteId": quote["id"], "paymentToken": "tok_stripe_valid" }),
        )
        .await;
    assert_eq!(steal.status, StatusCode::FORBIDDEN);
}
