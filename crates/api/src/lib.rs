//! Vendora API - marketplace REST backend.
//!
//! Library surface for the `vendora-api` binary and the integration-test
//! crate: the router assembly plus every module the handlers are built
//! from. Persistence and the payment provider are injected behind the
//! [`store::Store`] and [`payments::PaymentGateway`] seams, so the full
//! HTTP surface can run against in-memory backends.

#![cfg_attr(not(test), forbid(unsafe_code))]

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

pub use state::AppState;

/// Build the application router over the given state.
#[must_use]
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}
