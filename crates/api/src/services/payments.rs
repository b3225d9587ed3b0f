//! Card payments for orders through Stripe `PaymentIntents`.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use shopfront_core::{OrderId, OrderStatus, PaymentStatus, UserId, to_minor_units};

use crate::db::{OrderRepository, RepositoryError};
use crate::models::Order;
use crate::stripe::{PaymentIntent, PaymentIntentStatus, StripeClient, StripeError};

/// Errors from payment operations.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payments are not configured")]
    NotConfigured,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Payment not found")]
    IntentNotFound,

    #[error("Order is already paid")]
    AlreadyPaid,

    #[error("Order has been cancelled")]
    OrderCancelled,

    #[error("Order total cannot be charged")]
    InvalidAmount,

    #[error("Payment does not belong to this order")]
    IntentMismatch,

    #[error("payment provider error: {0}")]
    Stripe(#[from] StripeError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// `POST /api/payments/create-intent` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateIntentInput {
    pub order_id: OrderId,
}

/// `POST /api/payments/confirm` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmPaymentInput {
    pub payment_intent_id: String,
    pub order_id: OrderId,
}

/// A payment intent as returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct IntentView {
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentIntentStatus,
}

impl From<PaymentIntent> for IntentView {
    fn from(intent: PaymentIntent) -> Self {
        Self {
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
            amount: intent.amount,
            currency: intent.currency,
            status: intent.status,
        }
    }
}

/// Result of confirming a payment.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOutcome {
    pub status: PaymentIntentStatus,
    pub order: Order,
}

/// Payment service. `stripe` is `None` when payments are disabled.
pub struct PaymentService<'a> {
    orders: OrderRepository<'a>,
    stripe: Option<&'a StripeClient>,
}

impl<'a> PaymentService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, stripe: Option<&'a StripeClient>) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            stripe,
        }
    }

    fn stripe(&self) -> Result<&'a StripeClient, PaymentError> {
        self.stripe.ok_or(PaymentError::NotConfigured)
    }

    /// Create (or reuse) the payment intent for one of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::AlreadyPaid` or `PaymentError::OrderCancelled`
    /// for orders that cannot be charged.
    #[instrument(skip(self), fields(user_id = %user_id, order_id = %order_id))]
    pub async fn create_intent(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<IntentView, PaymentError> {
        let stripe = self.stripe()?;
        let order = self.owned_order(user_id, order_id).await?;
        check_chargeable(&order)?;

        let amount = to_minor_units(order.total)
            .filter(|a| *a > 0)
            .ok_or(PaymentError::InvalidAmount)?;

        if let Some(existing) = &order.payment_intent_id {
            let intent = stripe.retrieve_payment_intent(existing).await?;
            if intent.amount == amount && !matches!(intent.status, PaymentIntentStatus::Canceled) {
                return Ok(intent.into());
            }
        }

        let order_id_str = order.id.to_string();
        let idempotency_key = format!("order-{}-{}", order.id, order.updated_at.timestamp());
        let intent = stripe
            .create_payment_intent(
                amount,
                &[
                    ("order_id", order_id_str.as_str()),
                    ("order_number", order.order_number.as_str()),
                ],
                &idempotency_key,
            )
            .await?;

        self.orders.set_payment_intent(order.id, &intent.id).await?;
        info!(payment_intent_id = %intent.id, amount, "Payment intent attached to order");

        Ok(intent.into())
    }

    /// Confirm the payment for an order and record the outcome.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::IntentMismatch` if the intent was not created
    /// for this order and `PaymentError::OrderCancelled` once the order has
    /// been cancelled.
    #[instrument(skip(self, input), fields(user_id = %user_id, order_id = %input.order_id))]
    pub async fn confirm(
        &self,
        user_id: UserId,
        input: &ConfirmPaymentInput,
    ) -> Result<PaymentOutcome, PaymentError> {
        let stripe = self.stripe()?;
        let order = self.owned_order(user_id, input.order_id).await?;
        check_confirmable(order.status)?;

        if order.payment_intent_id.as_deref() != Some(input.payment_intent_id.as_str()) {
            return Err(PaymentError::IntentMismatch);
        }

        let mut intent = stripe
            .retrieve_payment_intent(&input.payment_intent_id)
            .await?;
        if intent.status.needs_confirmation() {
            intent = stripe.confirm_payment_intent(&intent.id).await?;
        }

        let order = match payment_status_for(intent.status) {
            Some(status) if status != order.payment_status => {
                let updated = self.orders.set_payment_status(order.id, status).await?;
                info!(payment_status = ?status, order_status = updated.status.as_str(), "Payment recorded");
                updated
            }
            _ => order,
        };

        if intent.status.is_failure() {
            warn!(intent_status = ?intent.status, "Payment did not succeed");
        }

        Ok(PaymentOutcome {
            status: intent.status,
            order,
        })
    }

    /// Status of a payment intent belonging to one of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::IntentNotFound` if no order of the user carries
    /// this intent.
    pub async fn status(&self, user_id: UserId, payment_intent_id: &str) -> Result<IntentView, PaymentError> {
        let stripe = self.stripe()?;

        self.orders
            .get_by_payment_intent(payment_intent_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(PaymentError::IntentNotFound)?;

        let mut view = IntentView::from(stripe.retrieve_payment_intent(payment_intent_id).await?);
        view.client_secret = None;
        Ok(view)
    }

    async fn owned_order(&self, user_id: UserId, order_id: OrderId) -> Result<Order, PaymentError> {
        self.orders
            .get_by_id(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(PaymentError::OrderNotFound)
    }
}

fn check_chargeable(order: &Order) -> Result<(), PaymentError> {
    if order.payment_status == PaymentStatus::Paid {
        return Err(PaymentError::AlreadyPaid);
    }
    if order.status == OrderStatus::Cancelled {
        return Err(PaymentError::OrderCancelled);
    }
    Ok(())
}

/// Cancelled orders cannot be charged.
const fn check_confirmable(status: OrderStatus) -> Result<(), PaymentError> {
    if matches!(status, OrderStatus::Cancelled) {
        return Err(PaymentError::OrderCancelled);
    }
    Ok(())
}

/// The order payment status an intent status settles on, if any.
const fn payment_status_for(status: PaymentIntentStatus) -> Option<PaymentStatus> {
    match status {
        PaymentIntentStatus::Succeeded => Some(PaymentStatus::Paid),
        PaymentIntentStatus::Canceled | PaymentIntentStatus::RequiresPaymentMethod => {
            Some(PaymentStatus::Failed)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_for() {
        assert_eq!(
            payment_status_for(PaymentIntentStatus::Succeeded),
            Some(PaymentStatus::Paid)
        );
        assert_eq!(
            payment_status_for(PaymentIntentStatus::Canceled),
            Some(PaymentStatus::Failed)
        );
        assert_eq!(payment_status_for(PaymentIntentStatus::Processing), None);
        assert_eq!(payment_status_for(PaymentIntentStatus::RequiresAction), None);
    }

    #[test]
    fn test_cancelled_orders_cannot_be_confirmed() {
        assert!(matches!(
            check_confirmable(OrderStatus::Cancelled),
            Err(PaymentError::OrderCancelled)
        ));
        assert!(check_confirmable(OrderStatus::Pending).is_ok());
        assert!(check_confirmable(OrderStatus::Processing).is_ok());
    }
}
