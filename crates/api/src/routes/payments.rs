//! Payment route handlers.
//!
//! These endpoints orchestrate between the order workflow and the payment
//! gateway: create an intent for an order (including one whose checkout
//! intent failed), confirm it, refund it (admin), or inspect it.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use vendora_core::{OrderId, PaymentStatus, Principal, to_minor_units};

use crate::error::{AppError, Result};
use crate::middleware::auth::{RequireAdmin, RequireAuth};
use crate::models::Order;
use crate::payments::PaymentIntent;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments/create-intent", post(create_intent))
        .route("/payments/confirm", post(confirm_payment))
        .route("/payments/{order_id}/refund", post(refund_payment))
        .route("/payments/intent/{intent_id}", get(get_intent))
}

/// Fetch an order for a payment operation; non-owners get a 404 rather
/// than a hint that the order exists.
async fn owned_order(state: &AppState, principal: Principal, id: OrderId) -> Result<Order> {
    let order = state.orders().order(principal, id).await;
    match order {
        Err(AppError::Unauthorized(_)) => {
            Err(AppError::NotFound(format!("order {id} not found")))
        }
        other => other,
    }
}

#[derive(Debug, Deserialize)]
struct CreateIntentRequest {
    order_id: OrderId,
}

/// `POST /payments/create-intent` - create (or recover) the intent for an
/// order and persist its id.
#[instrument(skip(state), fields(order_id = %request.order_id))]
async fn create_intent(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Json(request): Json<CreateIntentRequest>,
) -> Result<Json<PaymentIntent>> {
    let order = owned_order(&state, principal, request.order_id).await?;

    let amount = to_minor_units(order.final_amount()).ok_or_else(|| {
        AppError::InvalidInput("order amount out of range for payment".to_owned())
    })?;
    let intent = state
        .gateway()
        .create_intent(amount, &state.config().currency, &order.order_number)
        .await?;

    state
        .orders()
        .update_payment_status(order.id, PaymentStatus::Pending, Some(intent.id.clone()))
        .await?;

    Ok(Json(intent))
}

#[derive(Debug, Deserialize)]
struct ConfirmPaymentRequest {
    order_id: OrderId,
    payment_intent_id: String,
}

/// `POST /payments/confirm` - confirm the intent with the gateway; on
/// success the order is marked `Paid` (which also moves it to `Processing`).
#[instrument(skip(state), fields(order_id = %request.order_id))]
async fn confirm_payment(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<Json<serde_json::Value>> {
    let order = owned_order(&state, principal, request.order_id).await?;

    let intent = state
        .gateway()
        .confirm_intent(&request.payment_intent_id)
        .await?;

    if intent.status == crate::payments::IntentStatus::Succeeded {
        state
            .orders()
            .update_payment_status(order.id, PaymentStatus::Paid, Some(intent.id))
            .await?;
        return Ok(Json(json!({
            "message": "payment confirmed",
            "status": intent.status,
        })));
    }

    Ok(Json(json!({
        "message": "payment not settled",
        "status": intent.status,
    })))
}

/// `POST /payments/{order_id}/refund` - admin compensation: refunds the
/// intent and marks both the payment and the order `Refunded`.
#[instrument(skip(state))]
async fn refund_payment(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(order_id): Path<OrderId>,
) -> Result<Json<serde_json::Value>> {
    let order = state
        .store()
        .order(order_id)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

    let Some(intent_id) = order.payment_intent_id else {
        return Err(AppError::InvalidInput(
            "no payment associated with this order".to_owned(),
        ));
    };

    let refunded = state.gateway().refund_intent(&intent_id).await?;
    if !refunded {
        return Err(AppError::InvalidInput(
            "refund rejected by payment provider".to_owned(),
        ));
    }

    state.orders().mark_refunded(order.id).await?;
    Ok(Json(json!({ "message": "refund completed" })))
}

/// `GET /payments/intent/{intent_id}`
#[instrument(skip(state))]
async fn get_intent(
    State(state): State<AppState>,
    RequireAuth(_principal): RequireAuth,
    Path(intent_id): Path<String>,
) -> Result<Json<PaymentIntent>> {
    Ok(Json(state.gateway().intent(&intent_id).await?))
}
