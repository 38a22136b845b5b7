//! In-process payment gateway for tests and keyless dev runs.
//!
//! Intents live in a hash map; ids are deterministic (`pi_mock_000001`, ...).
//! A failing variant simulates provider outages so the checkout flow's
//! best-effort intent creation can be exercised.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use super::{GatewayError, IntentStatus, PaymentGateway, PaymentIntent};

/// In-memory [`PaymentGateway`] implementation.
#[derive(Default)]
pub struct MockGateway {
    intents: RwLock<HashMap<String, PaymentIntent>>,
    counter: AtomicU64,
    fail: bool,
}

impl MockGateway {
    /// A gateway where every operation succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway where every operation fails with a provider error, for
    /// exercising outage handling.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn check_available(&self) -> Result<(), GatewayError> {
        if self.fail {
            return Err(GatewayError::Api {
                status: 503,
                message: "mock gateway unavailable".to_owned(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_intent(
        &self,
        amount: i64,
        currency: &str,
        _order_number: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        self.check_available()?;
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("pi_mock_{n:06}");
        let intent = PaymentIntent {
            id: id.clone(),
            amount,
            currency: currency.to_owned(),
            status: IntentStatus::RequiresPaymentMethod,
            client_secret: Some(format!("{id}_secret")),
        };
        self.intents
            .write()
            .expect("RwLock poisoned")
            .insert(id, intent.clone());
        Ok(intent)
    }

    async fn confirm_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        self.check_available()?;
        let mut intents = self.intents.write().expect("RwLock poisoned");
        let intent = intents
            .get_mut(intent_id)
            .ok_or_else(|| GatewayError::IntentNotFound(intent_id.to_owned()))?;
        intent.status = IntentStatus::Succeeded;
        Ok(intent.clone())
    }

    async fn refund_intent(&self, intent_id: &str) -> Result<bool, GatewayError> {
        self.check_available()?;
        let intents = self.intents.read().expect("RwLock poisoned");
        let intent = intents
            .get(intent_id)
            .ok_or_else(|| GatewayError::IntentNotFound(intent_id.to_owned()))?;
        // Only settled intents can be refunded.
        Ok(intent.status == IntentStatus::Succeeded)
    }

    async fn intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        self.check_available()?;
        self.intents
            .read()
            .expect("RwLock poisoned")
            .get(intent_id)
            .cloned()
            .ok_or_else(|| GatewayError::IntentNotFound(intent_id.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_confirm_refund() {
        let gateway = MockGateway::new();
        let intent = gateway
            .create_intent(1999, "eur", "ORD-20250101-AAAAAAAA")
            .await
            .expect("create");
        assert_eq!(intent.amount, 1999);
        assert_eq!(intent.status, IntentStatus::RequiresPaymentMethod);
        assert!(intent.client_secret.is_some());

        // Unconfirmed intents can't be refunded.
        assert!(!gateway.refund_intent(&intent.id).await.expect("refund"));

        let confirmed = gateway.confirm_intent(&intent.id).await.expect("confirm");
        assert_eq!(confirmed.status, IntentStatus::Succeeded);

        assert!(gateway.refund_intent(&intent.id).await.expect("refund"));
    }

    #[tokio::test]
    async fn test_unknown_intent() {
        let gateway = MockGateway::new();
        let err = gateway.confirm_intent("pi_missing").await.expect_err("err");
        assert!(matches!(err, GatewayError::IntentNotFound(_)));
    }

    #[tokio::test]
    async fn test_failing_gateway() {
        let gateway = MockGateway::failing();
        let err = gateway
            .create_intent(100, "eur", "ORD-20250101-AAAAAAAA")
            .await
            .expect_err("must fail");
        assert!(matches!(err, GatewayError::Api { status: 503, .. }));
    }
}
