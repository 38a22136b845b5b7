//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::middleware::auth::TokenVerifier;
use crate::payments::PaymentGateway;
use crate::services::{CartService, CatalogService, OrderService, ReviewService};
use crate::store::Store;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; hands out per-request workflow services
/// wired to the injected store and gateway.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    verifier: TokenVerifier,
}

impl AppState {
    /// Create a new application state over the injected collaborators.
    #[must_use]
    pub fn new(config: ApiConfig, store: Arc<dyn Store>, gateway: Arc<dyn PaymentGateway>) -> Self {
        let verifier = TokenVerifier::new(&config.jwt_secret);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                gateway,
                verifier,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.inner.store
    }

    /// Get a reference to the payment gateway.
    #[must_use]
    pub fn gateway(&self) -> &Arc<dyn PaymentGateway> {
        &self.inner.gateway
    }

    /// Get a reference to the bearer-token verifier.
    #[must_use]
    pub fn verifier(&self) -> &TokenVerifier {
        &self.inner.verifier
    }

    /// Cart workflow.
    #[must_use]
    pub fn carts(&self) -> CartService {
        CartService::new(Arc::clone(&self.inner.store))
    }

    /// Order workflow.
    #[must_use]
    pub fn orders(&self) -> OrderService {
        OrderService::new(
            Arc::clone(&self.inner.store),
            Arc::clone(&self.inner.gateway),
            self.inner.config.currency.clone(),
        )
    }

    /// Review workflow.
    #[must_use]
    pub fn reviews(&self) -> ReviewService {
        ReviewService::new(Arc::clone(&self.inner.store))
    }

    /// Catalog workflow.
    #[must_use]
    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(Arc::clone(&self.inner.store))
    }
}
