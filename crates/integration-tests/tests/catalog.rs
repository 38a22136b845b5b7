//! End-to-end catalog tests: listing, filters, paging, and ownership.

use axum::http::StatusCode;
use serde_json::json;
use vendora_core::Role;

use vendora_integration_tests::{TestApp, seed_shop_and_product};

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.request("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_listing_filters_and_paging() {
    let app = TestApp::new();
    let owner = app.token(10, Role::Customer);
    let (status, shop) = app
        .post("/shops", &owner, json!({"name": "Atelier Est", "description": null}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let shop_id = shop["id"].as_i64().expect("shop id");

    for (name, price, stock, category) in [
        ("Mug", "12.00", 10, "kitchen"),
        ("Board", "54.00", 0, "kitchen"),
        ("Vase", "32.00", 3, "decor"),
    ] {
        let (status, _) = app
            .post(
                &format!("/shops/{shop_id}/products"),
                &owner,
                json!({
                    "name": name,
                    "price": price,
                    "stock": stock,
                    "shop_id": null,
                    "description": null,
                    "category": category,
                    "image_url": null,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create {name}");
    }

    let (status, page) = app.request("GET", "/products", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total_items"], 3);
    assert_eq!(page["page"], 1);

    let (_, kitchen) = app
        .request("GET", "/products?category=kitchen", None, None)
        .await;
    assert_eq!(kitchen["total_items"], 2);

    let (_, in_stock) = app.request("GET", "/products?in_stock=true", None, None).await;
    assert_eq!(in_stock["total_items"], 2);

    let (_, priced) = app
        .request("GET", "/products?min_price=20&max_price=40", None, None)
        .await;
    assert_eq!(priced["total_items"], 1);
    assert_eq!(priced["items"][0]["name"], "Vase");

    let (_, sorted) = app
        .request("GET", "/products?sort=price_desc&page_size=2", None, None)
        .await;
    assert_eq!(sorted["items"][0]["name"], "Board");
    assert_eq!(sorted["total_pages"], 2);

    let (_, second_page) = app
        .request("GET", "/products?sort=price_desc&page_size=2&page=2", None, None)
        .await;
    assert_eq!(second_page["items"].as_array().expect("items").len(), 1);

    // Shop-scoped listing.
    let (status, products) = app
        .request("GET", &format!("/shops/{shop_id}/products"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(products.as_array().expect("products").len(), 3);
}

#[tokio::test]
async fn test_product_management_ownership() {
    let app = TestApp::new();
    let (_, product) = seed_shop_and_product(&app, 10, "Mug", "12.00", 10).await;
    let owner = app.token(10, Role::Customer);
    let stranger = app.token(2, Role::Customer);
    let admin = app.token(9, Role::Admin);
    let uri = format!("/products/{product}");

    let update = json!({
        "name": "Mug",
        "price": "13.00",
        "stock": 10,
        "description": null,
        "category": null,
        "image_url": null,
    });

    // Strangers can't manage someone else's product; a stranger with no
    // token can't either.
    let (status, _) = app
        .request("PUT", &uri, Some(&stranger), Some(update.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.request("PUT", &uri, None, Some(update.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Owner and admin can.
    let (status, updated) = app
        .request("PUT", &uri, Some(&owner), Some(update))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], "13.00");

    let (status, _) = app.request("DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.request("GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validation_errors() {
    let app = TestApp::new();
    let owner = app.token(10, Role::Customer);

    let (status, _) = app
        .post("/shops", &owner, json!({"name": "  ", "description": null}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, shop) = app
        .post("/shops", &owner, json!({"name": "Atelier Ouest", "description": null}))
        .await;
    let shop_id = shop["id"].as_i64().expect("shop id");

    for (price, stock) in [("0", 5), ("-1.00", 5), ("10.00", -2)] {
        let (status, _) = app
            .post(
                &format!("/shops/{shop_id}/products"),
                &owner,
                json!({
                    "name": "Bowl",
                    "price": price,
                    "stock": stock,
                    "shop_id": null,
                    "description": null,
                    "category": null,
                    "image_url": null,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "price {price} stock {stock}");
    }

    let (status, _) = app.request("GET", "/shops/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.request("GET", "/shops/999/products", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
