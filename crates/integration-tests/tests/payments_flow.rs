//! End-to-end payment tests: intent creation at checkout, recovery via the
//! explicit endpoint, confirmation, refunds, and provider outages.

use axum::http::StatusCode;
use serde_json::json;
use vendora_core::Role;

use vendora_integration_tests::{TestApp, checkout_body, seed_shop_and_product};

async fn place_order(app: &TestApp, token: &str, product: i64, method: &str) -> serde_json::Value {
    app.post("/cart/add", token, json!({"product_id": product, "quantity": 1})).await;
    let (status, order) = app.post("/orders", token, checkout_body(method)).await;
    assert_eq!(status, StatusCode::CREATED, "checkout: {order}");
    order
}

#[tokio::test]
async fn test_checkout_creates_intent_and_confirm_marks_paid() {
    let app = TestApp::new();
    let (_, product) = seed_shop_and_product(&app, 10, "Lamp", "48.00", 5).await;
    let token = app.token(1, Role::Customer);

    let order = place_order(&app, &token, product, "credit_card").await;
    let order_id = order["id"].as_i64().expect("order id");
    let intent_id = order["payment_intent_id"].as_str().expect("intent id").to_owned();

    // The intent is inspectable and carries the amount in minor units.
    let (status, intent) = app.get(&format!("/payments/intent/{intent_id}"), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(intent["amount"], 4800);
    assert_eq!(intent["currency"], "eur");

    let (status, body) = app
        .post(
            "/payments/confirm",
            &token,
            json!({"order_id": order_id, "payment_intent_id": intent_id}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "confirm: {body}");
    assert_eq!(body["status"], "succeeded");

    // Paid forces the order into processing and stamps paid_at.
    let (_, order) = app.get(&format!("/orders/{order_id}"), &token).await;
    assert_eq!(order["payment_status"], "paid");
    assert_eq!(order["status"], "processing");
    assert!(order["paid_at"].is_string());
}

#[tokio::test]
async fn test_cash_on_delivery_has_no_intent() {
    let app = TestApp::new();
    let (_, product) = seed_shop_and_product(&app, 10, "Mug", "12.00", 5).await;
    let token = app.token(1, Role::Customer);

    let order = place_order(&app, &token, product, "cash_on_delivery").await;
    assert!(order["payment_intent_id"].is_null());
}

#[tokio::test]
async fn test_create_intent_recovers_an_intentless_order() {
    let app = TestApp::new();
    let (_, product) = seed_shop_and_product(&app, 10, "Mug", "12.00", 5).await;
    let token = app.token(1, Role::Customer);

    let order = place_order(&app, &token, product, "cash_on_delivery").await;
    let order_id = order["id"].as_i64().expect("order id");

    let (status, intent) = app
        .post("/payments/create-intent", &token, json!({"order_id": order_id}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let intent_id = intent["id"].as_str().expect("intent id");

    let (_, order) = app.get(&format!("/orders/{order_id}"), &token).await;
    assert_eq!(order["payment_intent_id"].as_str(), Some(intent_id));

    // Someone else's order reads as missing, not as forbidden.
    let stranger = app.token(2, Role::Customer);
    let (status, _) = app
        .post("/payments/create-intent", &stranger, json!({"order_id": order_id}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_gateway_outage_keeps_order_without_intent() {
    let app = TestApp::with_failing_gateway();
    let (_, product) = seed_shop_and_product(&app, 10, "Mug", "12.00", 5).await;
    let token = app.token(1, Role::Customer);

    // Checkout still succeeds; the intent is simply missing.
    let order = place_order(&app, &token, product, "credit_card").await;
    assert!(order["payment_intent_id"].is_null());

    // The explicit endpoint surfaces the provider failure.
    let order_id = order["id"].as_i64().expect("order id");
    let (status, body) = app
        .post("/payments/create-intent", &token, json!({"order_id": order_id}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().expect("message").contains("unavailable"));
}

#[tokio::test]
async fn test_refund_is_admin_only_and_requires_a_settled_intent() {
    let app = TestApp::new();
    let (_, product) = seed_shop_and_product(&app, 10, "Lamp", "48.00", 5).await;
    let token = app.token(1, Role::Customer);
    let admin = app.token(9, Role::Admin);

    let order = place_order(&app, &token, product, "credit_card").await;
    let order_id = order["id"].as_i64().expect("order id");
    let intent_id = order["payment_intent_id"].as_str().expect("intent id").to_owned();
    let refund_uri = format!("/payments/{order_id}/refund");

    // Customers can't refund.
    let (status, _) = app.request("POST", &refund_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Unsettled intent: the provider declines the refund.
    let (status, _) = app.request("POST", &refund_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.post(
        "/payments/confirm",
        &token,
        json!({"order_id": order_id, "payment_intent_id": intent_id}),
    )
    .await;

    let (status, _) = app.request("POST", &refund_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, order) = app.get(&format!("/orders/{order_id}"), &token).await;
    assert_eq!(order["status"], "refunded");
    assert_eq!(order["payment_status"], "refunded");
}

#[tokio::test]
async fn test_refund_without_intent_rejected() {
    let app = TestApp::new();
    let (_, product) = seed_shop_and_product(&app, 10, "Mug", "12.00", 5).await;
    let token = app.token(1, Role::Customer);
    let admin = app.token(9, Role::Admin);

    let order = place_order(&app, &token, product, "cash_on_delivery").await;
    let order_id = order["id"].as_i64().expect("order id");

    let (status, body) = app
        .request("POST", &format!("/payments/{order_id}/refund"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().expect("message").contains("no payment"));

    let (status, _) = app
        .request("POST", "/payments/424242/refund", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
