//! Payment route handlers.
//!
//! All endpoints answer 503 when Stripe is not configured.

use axum::extract::State;
use tracing::instrument;

use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::middleware::RequireAuth;
use crate::response::{self, ApiResponse};
use crate::services::PaymentService;
use crate::services::payments::{ConfirmPaymentInput, CreateIntentInput, IntentView, PaymentOutcome};
use crate::state::AppState;

/// `POST /api/payments/create-intent`
#[instrument(skip_all, fields(user_id = %user.id, order_id = %input.order_id))]
pub async fn create_intent(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(input): AppJson<CreateIntentInput>,
) -> Result<ApiResponse<IntentView>, AppError> {
    let intent = PaymentService::new(state.pool(), state.stripe())
        .create_intent(user.id, input.order_id)
        .await?;
    Ok(response::ok(intent))
}

/// `POST /api/payments/confirm`
#[instrument(skip_all, fields(user_id = %user.id, order_id = %input.order_id))]
pub async fn confirm(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(input): AppJson<ConfirmPaymentInput>,
) -> Result<ApiResponse<PaymentOutcome>, AppError> {
    let outcome = PaymentService::new(state.pool(), state.stripe())
        .confirm(user.id, &input)
        .await?;
    Ok(response::ok(outcome))
}

/// `GET /api/payments/{payment_intent_id}`
pub async fn status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(payment_intent_id): AppPath<String>,
) -> Result<ApiResponse<IntentView>, AppError> {
    let intent = PaymentService::new(state.pool(), state.stripe())
        .status(user.id, &payment_intent_id)
        .await?;
    Ok(response::ok(intent))
}
