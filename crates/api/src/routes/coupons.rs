//! Coupon validation for shoppers.

use axum::extract::State;
use tracing::instrument;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::response::{self, ApiResponse};
use crate::services::CouponService;
use crate::services::coupons::{CouponValidation, ValidateCouponInput};
use crate::state::AppState;

/// `POST /api/coupons/validate`
#[instrument(skip_all, fields(code = %input.code, subtotal = %input.subtotal))]
pub async fn validate(
    State(state): State<AppState>,
    AppJson(input): AppJson<ValidateCouponInput>,
) -> Result<ApiResponse<CouponValidation>, AppError> {
    let validation = CouponService::new(state.pool()).validate(&input).await?;
    Ok(response::ok(validation))
}
