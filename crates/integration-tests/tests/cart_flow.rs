//! End-to-end cart tests: lazy creation, merging, advisory stock checks,
//! live-priced snapshots.

use axum::http::StatusCode;
use serde_json::json;
use vendora_core::Role;

use vendora_integration_tests::{TestApp, seed_shop_and_product};

#[tokio::test]
async fn test_cart_requires_authentication() {
    let app = TestApp::new();
    let (status, _) = app.request("GET", "/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .request("POST", "/cart/add", None, Some(json!({"product_id": 1, "quantity": 1})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_add_merge_update_remove_clear() {
    let app = TestApp::new();
    let (_, product) = seed_shop_and_product(&app, 10, "Ceramic Mug", "12.50", 10).await;
    let token = app.token(1, Role::Customer);

    // Add twice: quantities merge into one line.
    let (status, _) = app
        .post("/cart/add", &token, json!({"product_id": product, "quantity": 2}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, item) = app
        .post("/cart/add", &token, json!({"product_id": product, "quantity": 3}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["quantity"], 5);
    let item_id = item["id"].as_i64().expect("item id");

    let (status, count) = app.get("/cart/count", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count["count"], 5);

    let (status, cart) = app.get("/cart", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"].as_array().expect("items").len(), 1);
    assert_eq!(cart["total_items"], 5);
    assert_eq!(cart["total_amount"], "62.50");
    assert_eq!(cart["items"][0]["product_name"], "Ceramic Mug");
    assert_eq!(cart["items"][0]["stock"], 10);

    // Overwrite the quantity.
    let (status, _) = app
        .request(
            "PUT",
            &format!("/cart/item/{item_id}"),
            Some(&token),
            Some(json!({"quantity": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, count) = app.get("/cart/count", &token).await;
    assert_eq!(count["count"], 1);

    // Remove the line; a second removal is a 404.
    let (status, _) = app
        .request("DELETE", &format!("/cart/item/{item_id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .request("DELETE", &format!("/cart/item/{item_id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Clear is idempotent.
    let (status, _) = app.request("DELETE", "/cart/clear", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.request("DELETE", "/cart/clear", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_advisory_stock_check_on_add() {
    let app = TestApp::new();
    let (_, product) = seed_shop_and_product(&app, 10, "Walnut Board", "54.00", 2).await;
    let token = app.token(1, Role::Customer);

    let (status, body) = app
        .post("/cart/add", &token, json!({"product_id": product, "quantity": 3}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().expect("message");
    assert!(message.contains("Walnut Board"), "got: {message}");

    // Cumulative add over stock is also rejected.
    app.post("/cart/add", &token, json!({"product_id": product, "quantity": 2}))
        .await;
    let (status, _) = app
        .post("/cart/add", &token, json!({"product_id": product, "quantity": 1}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_validation() {
    let app = TestApp::new();
    let (_, product) = seed_shop_and_product(&app, 10, "Vase", "32.00", 5).await;
    let token = app.token(1, Role::Customer);

    let (status, _) = app
        .post("/cart/add", &token, json!({"product_id": 9999, "quantity": 1}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for quantity in [0, -1, 101] {
        let (status, _) = app
            .post("/cart/add", &token, json!({"product_id": product, "quantity": quantity}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "quantity {quantity}");
    }
}

#[tokio::test]
async fn test_update_missing_item_is_404() {
    let app = TestApp::new();
    let token = app.token(1, Role::Customer);
    let (status, _) = app
        .request("PUT", "/cart/item/424242", Some(&token), Some(json!({"quantity": 1})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
