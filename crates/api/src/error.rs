//! Unified error handling.
//!
//! Provides the application error taxonomy returned by every workflow and
//! route handler. Expected business failures (not found, insufficient stock,
//! duplicate review, ...) map to 4xx statuses; store and gateway failures are
//! logged with full detail and reported to clients as a generic message.
//! All error responses are JSON bodies of the shape `{"message": "..."}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::middleware::auth::AuthError;
use crate::payments::GatewayError;
use crate::store::StoreError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Requested quantity exceeds a product's available stock.
    #[error("insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i32,
        requested: i32,
    },

    /// The caller already reviewed this product.
    #[error("you have already reviewed this product")]
    DuplicateReview,

    /// Caller identity missing, invalid, or not allowed to act on the resource.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Request failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Payment gateway failure; the provider message is passed through.
    #[error("payment error: {0}")]
    Gateway(#[from] GatewayError),

    /// Persistence failure.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound("resource not found".to_owned()),
            StoreError::InsufficientStock {
                product,
                available,
                requested,
            } => Self::InsufficientStock {
                product,
                available,
                requested,
            },
            other => Self::Store(other),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        Self::Unauthorized(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientStock { .. }
            | Self::DuplicateReview
            | Self::InvalidInput(_)
            | Self::Gateway(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose persistence details to clients; gateway messages are
        // passed through so the caller can see what the provider said.
        let message = match &self {
            Self::Store(err) => {
                tracing::error!(error = %err, "store error");
                "internal server error".to_owned()
            }
            Self::Gateway(err) => {
                tracing::error!(error = %err, "payment gateway error");
                self.to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_of(AppError::NotFound("order 3".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Unauthorized("not your order".to_owned())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::InvalidInput("quantity".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(AppError::DuplicateReview), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(AppError::InsufficientStock {
                product: "Mug".to_owned(),
                available: 1,
                requested: 2,
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Store(StoreError::DataCorruption("bad".to_owned()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_insufficient_stock_names_product() {
        let err = AppError::InsufficientStock {
            product: "Walnut Desk".to_owned(),
            available: 1,
            requested: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("Walnut Desk"));
        assert!(msg.contains("available 1"));
        assert!(msg.contains("requested 2"));
    }

    #[test]
    fn test_store_not_found_maps_to_404() {
        let err = AppError::from(StoreError::NotFound);
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
