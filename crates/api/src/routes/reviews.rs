//! Review route handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use vendora_core::{ProductId, ReviewId};

use crate::error::{AppError, Result};
use crate::middleware::auth::RequireAuth;
use crate::models::{ProductRating, Review};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reviews", post(create_review))
        .route("/reviews/my-reviews", get(my_reviews))
        .route("/reviews/product/{id}", get(product_reviews))
        .route("/reviews/product/{id}/rating", get(product_rating))
        .route("/reviews/{id}", put(update_review).delete(delete_review))
}

#[derive(Debug, Deserialize)]
struct CreateReviewRequest {
    product_id: ProductId,
    rating: i32,
    comment: Option<String>,
}

/// `POST /reviews` - one per (user, product).
#[instrument(skip(state, request), fields(product_id = %request.product_id))]
async fn create_review(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    let review = state
        .reviews()
        .create(
            principal.user_id,
            request.product_id,
            request.rating,
            request.comment,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /reviews/product/{id}`
#[instrument(skip(state))]
async fn product_reviews(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Vec<Review>>> {
    Ok(Json(state.reviews().for_product(id).await?))
}

/// `GET /reviews/product/{id}/rating` - distribution and average,
/// recomputed on read.
#[instrument(skip(state))]
async fn product_rating(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductRating>> {
    Ok(Json(state.reviews().product_rating(id).await?))
}

/// `GET /reviews/my-reviews`
#[instrument(skip(state))]
async fn my_reviews(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
) -> Result<Json<Vec<Review>>> {
    Ok(Json(state.reviews().for_user(principal.user_id).await?))
}

#[derive(Debug, Deserialize)]
struct UpdateReviewRequest {
    rating: i32,
    comment: Option<String>,
}

/// `PUT /reviews/{id}` - author only.
#[instrument(skip(state, request))]
async fn update_review(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<ReviewId>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<serde_json::Value>> {
    let updated = state
        .reviews()
        .update(principal.user_id, id, request.rating, request.comment)
        .await?;
    if !updated {
        return Err(AppError::NotFound("review not found".to_owned()));
    }
    Ok(Json(json!({ "message": "review updated" })))
}

/// `DELETE /reviews/{id}` - author only.
#[instrument(skip(state))]
async fn delete_review(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    Path(id): Path<ReviewId>,
) -> Result<Json<serde_json::Value>> {
    let deleted = state.reviews().delete(principal.user_id, id).await?;
    if !deleted {
        return Err(AppError::NotFound("review not found".to_owned()));
    }
    Ok(Json(json!({ "message": "review deleted" })))
}
