//! HTTP route handlers.
//!
//! One module per resource. Handlers stay thin: extract the caller, call a
//! workflow, serialize the result. All responses are JSON; errors surface
//! as `{"message": ...}` via [`AppError`](crate::error::AppError).

use axum::Router;

use crate::state::AppState;

pub mod cart;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod shops;

/// Assemble all resource routers.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(products::routes())
        .merge(shops::routes())
        .merge(cart::routes())
        .merge(orders::routes())
        .merge(payments::routes())
        .merge(reviews::routes())
}
