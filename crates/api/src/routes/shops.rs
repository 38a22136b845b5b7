//! Shop route handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::instrument;

use vendora_core::ShopId;

use crate::error::Result;
use crate::middleware::auth::RequireAuth;
use crate::models::{NewProduct, NewShop, Product, Shop};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/shops", get(list_shops).post(create_shop))
        .route("/shops/{id}", get(get_shop))
        .route(
            "/shops/{id}/products",
            get(shop_products).post(create_shop_product),
        )
        .route("/shops/{id}/rating", get(shop_rating))
}

/// `GET /shops`
#[instrument(skip(state))]
async fn list_shops(State(state): State<AppState>) -> Result<Json<Vec<Shop>>> {
    Ok(Json(state.catalog().shops().await?))
}

/// `POST /shops` - the authenticated caller becomes the owner.
#[instrument(skip(state, shop))]
async fn create_shop(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Json(shop): Json<NewShop>,
) -> Result<(StatusCode, Json<Shop>)> {
    let shop = state.catalog().create_shop(principal.user_id, shop).await?;
    Ok((StatusCode::CREATED, Json(shop)))
}

/// `GET /shops/{id}`
#[instrument(skip(state))]
async fn get_shop(State(state): State<AppState>, Path(id): Path<ShopId>) -> Result<Json<Shop>> {
    Ok(Json(state.catalog().shop(id).await?))
}

/// `GET /shops/{id}/products`
#[instrument(skip(state))]
async fn shop_products(
    State(state): State<AppState>,
    Path(id): Path<ShopId>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog().shop_products(id).await?))
}

/// `POST /shops/{id}/products` - shop owner or admin.
#[instrument(skip(state, product))]
async fn create_shop_product(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<ShopId>,
    Json(product): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state
        .catalog()
        .create_for_shop(principal, id, product)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Shop-level mean rating across all products.
#[derive(Debug, Serialize)]
struct ShopRatingResponse {
    shop_id: ShopId,
    average_rating: f64,
}

/// `GET /shops/{id}/rating`
#[instrument(skip(state))]
async fn shop_rating(
    State(state): State<AppState>,
    Path(id): Path<ShopId>,
) -> Result<Json<ShopRatingResponse>> {
    let average_rating = state.reviews().shop_average(id).await?;
    Ok(Json(ShopRatingResponse {
        shop_id: id,
        average_rating,
    }))
}
