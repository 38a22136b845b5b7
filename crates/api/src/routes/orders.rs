//! Order route handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use vendora_core::{
    OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, ShopId, UserId,
};

use crate::error::{AppError, Result};
use crate::middleware::auth::{RequireAdmin, RequireAuth};
use crate::models::{Address, Order, OrderItem, OrderStats};
use crate::services::CheckoutRequest;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/my-orders", get(my_orders))
        .route("/orders/stats", get(order_stats))
        .route("/orders/number/{order_number}", get(get_order_by_number))
        .route("/orders/status/{status}", get(orders_by_status))
        .route("/orders/shop/{shop_id}", get(shop_orders))
        .route("/orders/shop/{shop_id}/stats", get(shop_order_stats))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/cancel", put(cancel_order))
        .route("/orders/{id}/status", put(update_order_status))
}

/// Order as returned to clients, with the derived amounts materialized.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_cost: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub shipping: Address,
    pub billing: Address,
    pub payment_intent_id: Option<String>,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub reviewed: bool,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        let total_price = item.total_price();
        Self {
            id: item.id,
            product_id: item.product_id,
            product_name: item.product_name,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price,
            reviewed: item.reviewed,
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let final_amount = order.final_amount();
        Self {
            id: order.id,
            order_number: order.order_number,
            user_id: order.user_id,
            status: order.status,
            payment_status: order.payment_status,
            payment_method: order.payment_method,
            subtotal: order.subtotal,
            tax_amount: order.tax_amount,
            shipping_cost: order.shipping_cost,
            discount_amount: order.discount_amount,
            final_amount,
            shipping: order.shipping,
            billing: order.billing,
            payment_intent_id: order.payment_intent_id,
            items: order.items.into_iter().map(Into::into).collect(),
            created_at: order.created_at,
            paid_at: order.paid_at,
            shipped_at: order.shipped_at,
            delivered_at: order.delivered_at,
        }
    }
}

fn to_responses(orders: Vec<Order>) -> Vec<OrderResponse> {
    orders.into_iter().map(Into::into).collect()
}

/// `POST /orders` - checkout the caller's cart.
#[instrument(skip(state, request))]
async fn create_order(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>)> {
    let order = state
        .orders()
        .create_from_cart(principal.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// `GET /orders/my-orders`
#[instrument(skip(state))]
async fn my_orders(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
) -> Result<Json<Vec<OrderResponse>>> {
    let orders = state.orders().my_orders(principal.user_id).await?;
    Ok(Json(to_responses(orders)))
}

/// `GET /orders/{id}` - owner or admin.
#[instrument(skip(state))]
async fn get_order(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderResponse>> {
    let order = state.orders().order(principal, id).await?;
    Ok(Json(order.into()))
}

/// `GET /orders/number/{order_number}` - owner or admin.
#[instrument(skip(state))]
async fn get_order_by_number(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(order_number): Path<String>,
) -> Result<Json<OrderResponse>> {
    let order = state.orders().order_by_number(principal, &order_number).await?;
    Ok(Json(order.into()))
}

/// `PUT /orders/{id}/cancel` - owner, `Pending` orders only.
#[instrument(skip(state))]
async fn cancel_order(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<serde_json::Value>> {
    let cancelled = state.orders().cancel(principal.user_id, id).await?;
    if !cancelled {
        return Err(AppError::InvalidInput(
            "this order cannot be cancelled".to_owned(),
        ));
    }
    Ok(Json(json!({ "message": "order cancelled" })))
}

/// `GET /orders/shop/{shop_id}` - shop owner or admin.
#[instrument(skip(state))]
async fn shop_orders(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(shop_id): Path<ShopId>,
) -> Result<Json<Vec<OrderResponse>>> {
    let orders = state.orders().orders_for_shop(principal, shop_id).await?;
    Ok(Json(to_responses(orders)))
}

/// `GET /orders/shop/{shop_id}/stats` - shop owner or admin.
#[instrument(skip(state))]
async fn shop_order_stats(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(shop_id): Path<ShopId>,
) -> Result<Json<OrderStats>> {
    let stats = state.orders().stats_for_shop(principal, shop_id).await?;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
struct UpdateOrderStatusRequest {
    status: OrderStatus,
}

/// `PUT /orders/{id}/status` - admin; validated against the transition graph.
#[instrument(skip(state))]
async fn update_order_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<serde_json::Value>> {
    state.orders().update_status(id, request.status).await?;
    Ok(Json(
        json!({ "message": format!("status updated: {}", request.status) }),
    ))
}

/// `GET /orders/status/{status}` - admin.
#[instrument(skip(state))]
async fn orders_by_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(status): Path<String>,
) -> Result<Json<Vec<OrderResponse>>> {
    let status: OrderStatus = status
        .parse()
        .map_err(AppError::InvalidInput)?;
    let orders = state.orders().orders_with_status(status).await?;
    Ok(Json(to_responses(orders)))
}

/// `GET /orders/stats` - admin, all shops.
#[instrument(skip(state))]
async fn order_stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<OrderStats>> {
    Ok(Json(state.orders().stats(None).await?))
}
