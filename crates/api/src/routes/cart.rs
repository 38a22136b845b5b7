//! Cart route handlers. All endpoints require authentication.

use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use vendora_core::{CartItemId, ProductId};

use crate::error::{AppError, Result};
use crate::middleware::auth::RequireAuth;
use crate::models::{CartItem, CartView};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart))
        .route("/cart/count", get(cart_count))
        .route("/cart/add", post(add_item))
        .route("/cart/item/{id}", put(update_item).delete(remove_item))
        .route("/cart/clear", delete(clear_cart))
}

/// `GET /cart` - live-priced snapshot with totals.
#[instrument(skip(state))]
async fn get_cart(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
) -> Result<Json<CartView>> {
    Ok(Json(state.carts().snapshot(principal.user_id).await?))
}

#[derive(Debug, Serialize)]
struct CartCountResponse {
    count: i32,
}

/// `GET /cart/count` - total quantity across lines.
#[instrument(skip(state))]
async fn cart_count(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
) -> Result<Json<CartCountResponse>> {
    let count = state.carts().item_count(principal.user_id).await?;
    Ok(Json(CartCountResponse { count }))
}

#[derive(Debug, Deserialize)]
struct AddToCartRequest {
    product_id: ProductId,
    quantity: i32,
}

/// `POST /cart/add` - add a product, merging with an existing line.
#[instrument(skip(state), fields(product_id = %request.product_id, quantity = request.quantity))]
async fn add_item(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartItem>> {
    let item = state
        .carts()
        .add_item(principal.user_id, request.product_id, request.quantity)
        .await?;
    Ok(Json(item))
}

#[derive(Debug, Deserialize)]
struct UpdateCartItemRequest {
    quantity: i32,
}

/// `PUT /cart/item/{id}` - overwrite a line's quantity.
#[instrument(skip(state))]
async fn update_item(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<CartItemId>,
    Json(request): Json<UpdateCartItemRequest>,
) -> Result<Json<serde_json::Value>> {
    let updated = state
        .carts()
        .update_item_quantity(principal.user_id, id, request.quantity)
        .await?;
    if !updated {
        return Err(AppError::NotFound(
            "cart item not found or stock insufficient".to_owned(),
        ));
    }
    Ok(Json(json!({ "message": "cart item updated" })))
}

/// `DELETE /cart/item/{id}`
#[instrument(skip(state))]
async fn remove_item(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<CartItemId>,
) -> Result<Json<serde_json::Value>> {
    let removed = state.carts().remove_item(principal.user_id, id).await?;
    if !removed {
        return Err(AppError::NotFound("cart item not found".to_owned()));
    }
    Ok(Json(json!({ "message": "cart item removed" })))
}

/// `DELETE /cart/clear` - idempotent.
#[instrument(skip(state))]
async fn clear_cart(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
) -> Result<Json<serde_json::Value>> {
    state.carts().clear(principal.user_id).await?;
    Ok(Json(json!({ "message": "cart cleared" })))
}
