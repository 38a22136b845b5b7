//! Vendora API - marketplace REST backend binary.
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - `PostgreSQL` via sqlx when `VENDORA_DATABASE_URL` is set; otherwise an
//!   in-memory store (prototype mode, data lost on restart)
//! - Stripe payment intents when `STRIPE_SECRET_KEY` is set; otherwise an
//!   in-process mock gateway
//! - HS256 bearer tokens for caller identity (mint dev tokens with
//!   `vendora-cli token`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vendora_api::config::ApiConfig;
use vendora_api::payments::{MockGateway, PaymentGateway, StripeClient};
use vendora_api::state::AppState;
use vendora_api::store::{MemoryStore, PgStore, Store, create_pool};

#[tokio::main]
async fn main() {
    // Load configuration from environment
    let config = ApiConfig::from_env().expect("Failed to load configuration");

    // Initialize tracing with EnvFilter
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vendora_api=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Select the store backend
    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await.expect("Failed to create database pool");
            tracing::info!("Database pool created");
            // NOTE: Migrations are NOT run automatically on startup.
            // Run them explicitly via: cargo run -p vendora-cli -- migrate
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("VENDORA_DATABASE_URL not set; using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    // Select the payment gateway
    let gateway: Arc<dyn PaymentGateway> = match &config.stripe_secret_key {
        Some(key) => {
            let client = StripeClient::new(key).expect("Failed to build payment gateway client");
            tracing::info!("Stripe gateway configured");
            Arc::new(client)
        }
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set; using mock payment gateway");
            Arc::new(MockGateway::new())
        }
    };

    let addr = config.socket_addr();
    let state = AppState::new(config, store, gateway);
    let app = vendora_api::app(state);

    tracing::info!("vendora-api listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
