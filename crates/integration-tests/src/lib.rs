//! Test harness for end-to-end API tests.
//!
//! Builds the full router over the in-memory store and the mock payment
//! gateway, and drives it in-process with `tower::ServiceExt::oneshot`.
//! No network, no database: the same seams the binary wires at startup are
//! wired here to their test implementations.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use vendora_api::config::ApiConfig;
use vendora_api::middleware::auth::issue_token;
use vendora_api::payments::{MockGateway, PaymentGateway};
use vendora_api::state::AppState;
use vendora_api::store::MemoryStore;
use vendora_core::{Role, UserId};

const TEST_JWT_SECRET: &str = "integration-test-signing-key-0123456789";

/// A fully wired application over in-memory backends.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    /// Build the app with a gateway where every operation succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::with_gateway(Arc::new(MockGateway::new()))
    }

    /// Build the app with a gateway where every operation fails, for
    /// exercising provider-outage handling.
    #[must_use]
    pub fn with_failing_gateway() -> Self {
        Self::with_gateway(Arc::new(MockGateway::failing()))
    }

    fn with_gateway(gateway: Arc<dyn PaymentGateway>) -> Self {
        let config = ApiConfig {
            host: "127.0.0.1".parse().expect("host"),
            port: 0,
            database_url: None,
            jwt_secret: SecretString::from(TEST_JWT_SECRET),
            currency: "eur".to_owned(),
            stripe_secret_key: None,
        };
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store.clone(), gateway);
        Self {
            router: vendora_api::app(state),
            store,
        }
    }

    /// Mint a bearer token accepted by this app.
    #[must_use]
    pub fn token(&self, user_id: i32, role: Role) -> String {
        issue_token(
            &SecretString::from(TEST_JWT_SECRET),
            UserId::new(user_id),
            role,
            60,
        )
        .expect("issue token")
    }

    /// Send one request and return `(status, parsed JSON body)`.
    ///
    /// Non-JSON bodies come back as a JSON string; empty bodies as null.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).expect("serialize body")))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();

        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    /// Convenience: authenticated GET.
    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request("GET", uri, Some(token), None).await
    }

    /// Convenience: authenticated POST with a JSON body.
    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, Some(token), Some(body)).await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Seed a shop (owned by `owner`) and one product via the HTTP surface.
/// Returns `(shop_id, product_id)`.
pub async fn seed_shop_and_product(
    app: &TestApp,
    owner: i32,
    name: &str,
    price: &str,
    stock: i32,
) -> (i64, i64) {
    let token = app.token(owner, Role::Customer);
    let (status, shop) = app
        .post(
            "/shops",
            &token,
            serde_json::json!({ "name": format!("{name} shop"), "description": null }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "create shop: {shop}");
    let shop_id = shop["id"].as_i64().expect("shop id");

    let (status, product) = app
        .post(
            &format!("/shops/{shop_id}/products"),
            &token,
            serde_json::json!({
                "name": name,
                "price": price,
                "stock": stock,
                "shop_id": null,
                "description": null,
                "category": null,
                "image_url": null,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "create product: {product}");
    let product_id = product["id"].as_i64().expect("product id");

    (shop_id, product_id)
}

/// A checkout request body with the given payment method.
#[must_use]
pub fn checkout_body(payment_method: &str) -> Value {
    serde_json::json!({
        "payment_method": payment_method,
        "tax_amount": "0",
        "shipping_cost": "0",
        "discount_amount": "0",
        "shipping": {
            "address": "5 Rue des Lilas",
            "city": "Bordeaux",
            "postal_code": "33000",
            "country": "FR",
        },
        "billing": null,
    })
}
