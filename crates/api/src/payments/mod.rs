//! Payment gateway seam.
//!
//! The order workflow and the payment routes talk to a [`PaymentGateway`],
//! never to a concrete provider. Amounts cross this boundary in minor
//! currency units (cents). Two implementations:
//!
//! - [`StripeClient`] - the real provider, selected when `STRIPE_SECRET_KEY`
//!   is configured.
//! - [`MockGateway`] - in-process intents for tests and keyless dev runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod mock;
mod stripe;

pub use mock::MockGateway;
pub use stripe::StripeClient;

/// Errors that can occur when talking to the payment provider.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error response.
    #[error("payment provider error ({status}): {message}")]
    Api { status: u16, message: String },

    /// No intent with the given id.
    #[error("payment intent not found: {0}")]
    IntentNotFound(String),

    /// Failed to parse a provider response.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Lifecycle status of a payment intent, mirroring the provider's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    Processing,
    Succeeded,
    Canceled,
    /// Any provider status this client doesn't model.
    #[serde(other)]
    Unknown,
}

/// A pending charge held by the gateway, identified by an opaque id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Amount in minor currency units (cents).
    pub amount: i64,
    pub currency: String,
    pub status: IntentStatus,
    /// Secret handed to browser-side payment elements.
    pub client_secret: Option<String>,
}

/// The payment provider interface consumed by the order workflow.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an intent for `amount` minor units, tagged with the order
    /// number so provider dashboards can link back to the order.
    async fn create_intent(
        &self,
        amount: i64,
        currency: &str,
        order_number: &str,
    ) -> Result<PaymentIntent, GatewayError>;

    /// Confirm an intent.
    async fn confirm_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;

    /// Refund an intent in full. Returns `true` when the provider reports
    /// the refund succeeded.
    async fn refund_intent(&self, intent_id: &str) -> Result<bool, GatewayError>;

    /// Fetch an intent by id.
    async fn intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError>;
}
