//! Product route handlers.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use vendora_core::{ProductId, ShopId};

use crate::error::Result;
use crate::middleware::auth::RequireAuth;
use crate::models::{Paged, Product, ProductFilter, ProductSort, ProductUpdate};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// Query parameters for `GET /products`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListProductsQuery {
    pub page: u32,
    pub page_size: u32,
    pub shop_id: Option<ShopId>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock: bool,
    pub sort: Option<ProductSort>,
}

impl From<ListProductsQuery> for ProductFilter {
    fn from(query: ListProductsQuery) -> Self {
        Self {
            shop_id: query.shop_id,
            category: query.category,
            min_price: query.min_price,
            max_price: query.max_price,
            in_stock: query.in_stock,
            sort: query.sort.unwrap_or_default(),
            page: query.page,
            page_size: query.page_size,
        }
    }
}

/// `GET /products` - paged, filtered catalog listing.
#[instrument(skip(state))]
async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<Paged<Product>>> {
    let page = state.catalog().list(query.into()).await?;
    Ok(Json(page))
}

/// `GET /products/{id}`
#[instrument(skip(state))]
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(state.catalog().product(id).await?))
}

/// `PUT /products/{id}` - shop owner or admin.
#[instrument(skip(state, update))]
async fn update_product(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<ProductId>,
    Json(update): Json<ProductUpdate>,
) -> Result<Json<Product>> {
    let product = state.catalog().update_product(principal, id, update).await?;
    Ok(Json(product))
}

/// `DELETE /products/{id}` - shop owner or admin.
#[instrument(skip(state))]
async fn delete_product(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<ProductId>,
) -> Result<Json<serde_json::Value>> {
    state.catalog().delete_product(principal, id).await?;
    Ok(Json(serde_json::json!({ "message": "product deleted" })))
}
