//! Stripe API payloads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A Stripe `PaymentIntent`, reduced to the fields the store uses.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Amount in the currency's minor unit.
    pub amount: i64,
    pub currency: String,
    pub status: PaymentIntentStatus,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    /// The order ID recorded when the intent was created.
    #[must_use]
    pub fn order_id(&self) -> Option<&str> {
        self.metadata.get("order_id").map(String::as_str)
    }
}

/// Lifecycle status of a `PaymentIntent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

impl PaymentIntentStatus {
    /// Whether the intent must still be confirmed server-side.
    #[must_use]
    pub const fn needs_confirmation(self) -> bool {
        matches!(self, Self::RequiresConfirmation)
    }

    /// Whether the payment definitively did not go through.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Canceled | Self::RequiresPaymentMethod)
    }
}

/// Error body returned by Stripe, `{"error": {...}}`.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_payment_intent() {
        let json = r#"{
            "id": "pi_123",
            "object": "payment_intent",
            "amount": 2599,
            "currency": "usd",
            "status": "requires_payment_method",
            "client_secret": "pi_123_secret_abc",
            "metadata": {"order_id": "42"}
        }"#;

        let intent: PaymentIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.amount, 2599);
        assert_eq!(intent.status, PaymentIntentStatus::RequiresPaymentMethod);
        assert_eq!(intent.order_id(), Some("42"));
        assert!(intent.status.is_failure());
    }

    #[test]
    fn test_unknown_status() {
        let status: PaymentIntentStatus = serde_json::from_str(r#""something_new""#).unwrap();
        assert_eq!(status, PaymentIntentStatus::Unknown);
        assert!(!status.needs_confirmation());
    }
}
