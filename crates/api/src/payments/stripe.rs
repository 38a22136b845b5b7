//! Stripe payment gateway client.
//!
//! Talks to the Payment Intents and Refunds endpoints of the v1 API.
//! Requests are form-encoded per the Stripe convention; the secret key is
//! sent as a bearer token.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use async_trait::async_trait;

use super::{GatewayError, PaymentGateway, PaymentIntent};

/// Stripe API base URL.
const BASE_URL: &str = "https://api.stripe.com/v1";

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build or the key
    /// contains characters invalid in a header value.
    pub fn new(secret_key: &SecretString) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", secret_key.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| GatewayError::Parse(format!("invalid API key format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_header);

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self { client })
    }

    /// POST a form-encoded request and decode the provider response.
    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T, GatewayError> {
        let response = self.client.post(url).form(params).send().await?;
        decode_response(response).await
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_intent(
        &self,
        amount: i64,
        currency: &str,
        order_number: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        let url = format!("{BASE_URL}/payment_intents");
        let amount = amount.to_string();
        let params = [
            ("amount", amount.as_str()),
            ("currency", currency),
            ("metadata[order_number]", order_number),
            ("automatic_payment_methods[enabled]", "true"),
        ];

        let intent: ApiIntent = self.post_form(&url, &params).await?;
        tracing::info!(intent_id = %intent.id, order_number, "payment intent created");
        Ok(intent.into())
    }

    async fn confirm_intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let url = format!("{BASE_URL}/payment_intents/{intent_id}/confirm");
        let intent: ApiIntent = self.post_form(&url, &[]).await?;
        tracing::info!(intent_id, status = ?intent.status, "payment intent confirmed");
        Ok(intent.into())
    }

    async fn refund_intent(&self, intent_id: &str) -> Result<bool, GatewayError> {
        let url = format!("{BASE_URL}/refunds");
        let params = [("payment_intent", intent_id)];
        let refund: ApiRefund = self.post_form(&url, &params).await?;
        tracing::info!(intent_id, status = %refund.status, "refund requested");
        Ok(refund.status == "succeeded")
    }

    async fn intent(&self, intent_id: &str) -> Result<PaymentIntent, GatewayError> {
        let url = format!("{BASE_URL}/payment_intents/{intent_id}");
        let response = self.client.get(&url).send().await?;
        let intent: ApiIntent = decode_response(response).await?;
        Ok(intent.into())
    }
}

/// Decode a provider response, mapping error statuses to `GatewayError::Api`
/// with the provider's own message passed through.
async fn decode_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, GatewayError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map_or(body, |parsed| parsed.error.message);
        return Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| GatewayError::Parse(e.to_string()))
}

/// Payment intent resource as returned by the provider.
#[derive(Debug, Deserialize)]
struct ApiIntent {
    id: String,
    amount: i64,
    currency: String,
    status: super::IntentStatus,
    client_secret: Option<String>,
}

impl From<ApiIntent> for PaymentIntent {
    fn from(intent: ApiIntent) -> Self {
        Self {
            id: intent.id,
            amount: intent.amount,
            currency: intent.currency,
            status: intent.status,
            client_secret: intent.client_secret,
        }
    }
}

/// Refund resource; only the status is inspected.
#[derive(Debug, Deserialize)]
struct ApiRefund {
    status: String,
}

/// Error envelope the provider wraps failures in.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_status_parsing() {
        let intent: ApiIntent = serde_json::from_str(
            r#"{"id":"pi_123","amount":1999,"currency":"eur","status":"succeeded","client_secret":"pi_123_secret"}"#,
        )
        .expect("deserialize");
        assert_eq!(intent.status, super::super::IntentStatus::Succeeded);

        // Statuses this client doesn't model fall back to Unknown instead of
        // failing the whole response.
        let intent: ApiIntent = serde_json::from_str(
            r#"{"id":"pi_123","amount":1999,"currency":"eur","status":"requires_capture","client_secret":null}"#,
        )
        .expect("deserialize");
        assert_eq!(intent.status, super::super::IntentStatus::Unknown);
    }

    #[test]
    fn test_error_body_parsing() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"error":{"type":"invalid_request_error","message":"No such payment_intent"}}"#,
        )
        .expect("deserialize");
        assert_eq!(body.error.message, "No such payment_intent");
    }
}
