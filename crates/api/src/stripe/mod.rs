//! Stripe `PaymentIntents` client.
//!
//! Talks to the REST API directly with form-encoded requests and the secret
//! key as a bearer token. Only the three calls checkout needs are covered:
//! create, retrieve and confirm.

mod types;

pub use types::{PaymentIntent, PaymentIntentStatus};

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::StripeConfig;
use types::ErrorResponse;

/// Errors that can occur when calling Stripe.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe rejected the request.
    #[error("Stripe API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        kind: Option<String>,
        code: Option<String>,
    },

    /// The response body was not what we expected.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The payment intent ID is malformed.
    #[error("Invalid payment intent ID")]
    InvalidId,
}

/// Client for the Stripe `PaymentIntents` API.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    secret_key: SecretString,
    api_base: String,
    currency: String,
}

impl StripeClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Http` if the HTTP client cannot be built.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                secret_key: config.secret_key.clone(),
                api_base: config.api_base.trim_end_matches('/').to_string(),
                currency: config.currency.clone(),
            }),
        })
    }

    /// The currency new intents are created in.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.inner.currency
    }

    /// Create a payment intent for `amount` minor units.
    ///
    /// `idempotency_key` makes retries for the same order return the same
    /// intent.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Api` if Stripe rejects the request.
    #[instrument(skip(self, metadata))]
    pub async fn create_payment_intent(
        &self,
        amount: i64,
        metadata: &[(&str, &str)],
        idempotency_key: &str,
    ) -> Result<PaymentIntent, StripeError> {
        let amount = amount.to_string();
        let mut params: Vec<(String, &str)> = vec![
            ("amount".to_string(), amount.as_str()),
            ("currency".to_string(), self.currency()),
            ("automatic_payment_methods[enabled]".to_string(), "true"),
        ];
        params.extend(
            metadata
                .iter()
                .map(|(key, value)| (format!("metadata[{key}]"), *value)),
        );

        let request = self
            .inner
            .client
            .post(format!("{}/v1/payment_intents", self.inner.api_base))
            .bearer_auth(self.inner.secret_key.expose_secret())
            .header("Idempotency-Key", idempotency_key)
            .form(&params);

        let intent: PaymentIntent = send(request).await?;
        debug!(payment_intent_id = %intent.id, "Payment intent created");
        Ok(intent)
    }

    /// Fetch a payment intent.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::InvalidId` for a malformed ID and
    /// `StripeError::Api` if Stripe does not know it.
    #[instrument(skip(self))]
    pub async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, StripeError> {
        check_intent_id(id)?;

        let request = self
            .inner
            .client
            .get(format!("{}/v1/payment_intents/{id}", self.inner.api_base))
            .bearer_auth(self.inner.secret_key.expose_secret());

        send(request).await
    }

    /// Confirm a payment intent.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::InvalidId` for a malformed ID and
    /// `StripeError::Api` if Stripe refuses the confirmation.
    #[instrument(skip(self))]
    pub async fn confirm_payment_intent(&self, id: &str) -> Result<PaymentIntent, StripeError> {
        check_intent_id(id)?;

        let request = self
            .inner
            .client
            .post(format!("{}/v1/payment_intents/{id}/confirm", self.inner.api_base))
            .bearer_auth(self.inner.secret_key.expose_secret());

        send(request).await
    }
}

/// Send a request and decode either the payload or Stripe's error body.
async fn send<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, StripeError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(api_error(status.as_u16(), &body));
    }
    Ok(serde_json::from_str(&body)?)
}

fn api_error(status: u16, body: &str) -> StripeError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse { error }) => StripeError::Api {
            status,
            message: error
                .message
                .unwrap_or_else(|| "Unknown Stripe error".to_string()),
            kind: error.kind,
            code: error.code,
        },
        Err(_) => StripeError::Api {
            status,
            message: "Unexpected response from Stripe".to_string(),
            kind: None,
            code: None,
        },
    }
}

/// Payment intent IDs look like `pi_` followed by letters and digits.
fn check_intent_id(id: &str) -> Result<(), StripeError> {
    let valid = id.len() <= 255
        && id
            .strip_prefix("pi_")
            .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()));

    if valid {
        Ok(())
    } else {
        Err(StripeError::InvalidId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_intent_id() {
        assert!(check_intent_id("pi_3MtwBwLkdIwHu7ix28a3tqPa").is_ok());
        assert!(check_intent_id("pi_").is_err());
        assert!(check_intent_id("ch_123").is_err());
        assert!(check_intent_id("pi_123/../../customers").is_err());
    }

    #[test]
    fn test_api_error_parsing() {
        let body = r#"{"error": {"message": "No such payment_intent: 'pi_x'", "type": "invalid_request_error", "code": "resource_missing"}}"#;
        match api_error(404, body) {
            StripeError::Api {
                status,
                message,
                kind,
                code,
            } => {
                assert_eq!(status, 404);
                assert_eq!(message, "No such payment_intent: 'pi_x'");
                assert_eq!(kind.as_deref(), Some("invalid_request_error"));
                assert_eq!(code.as_deref(), Some("resource_missing"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(matches!(
            api_error(500, "<html>"),
            StripeError::Api { status: 500, .. }
        ));
    }
}
