//! Admin coupon management.

use axum::extract::State;
use tracing::{info, instrument};

use shopfront_core::CouponId;

use crate::error::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::RequireStaff;
use crate::models::{Coupon, CouponInput, CouponUpdate, Page, PageParams};
use crate::response::{self, ApiResponse, Message};
use crate::services::CouponService;
use crate::state::AppState;

/// `GET /api/admin/coupons`
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<ApiResponse<Page<Coupon>>, AppError> {
    let page = CouponService::new(state.pool()).list(params).await?;
    Ok(response::ok(page))
}

/// `GET /api/admin/coupons/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
    AppPath(id): AppPath<CouponId>,
) -> Result<ApiResponse<Coupon>, AppError> {
    let coupon = CouponService::new(state.pool()).get(id).await?;
    Ok(response::ok(coupon))
}

/// `POST /api/admin/coupons`
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(admin): RequireStaff,
    AppJson(input): AppJson<CouponInput>,
) -> Result<ApiResponse<Coupon>, AppError> {
    let coupon = CouponService::new(state.pool()).create(&input).await?;
    info!(coupon_id = %coupon.id, code = %coupon.code, "Coupon created");
    Ok(response::created(coupon))
}

/// `PUT /api/admin/coupons/{id}`
#[instrument(skip_all, fields(admin = %admin.id, coupon_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(admin): RequireStaff,
    AppPath(id): AppPath<CouponId>,
    AppJson(update): AppJson<CouponUpdate>,
) -> Result<ApiResponse<Coupon>, AppError> {
    let coupon = CouponService::new(state.pool()).update(id, &update).await?;
    Ok(response::ok(coupon))
}

/// `DELETE /api/admin/coupons/{id}`
#[instrument(skip_all, fields(admin = %admin.id, coupon_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(admin): RequireStaff,
    AppPath(id): AppPath<CouponId>,
) -> Result<ApiResponse<Message>, AppError> {
    CouponService::new(state.pool()).delete(id).await?;
    Ok(response::message("Coupon deleted"))
}
