//! Order route handlers for shoppers.

use axum::extract::State;
use tracing::{info, instrument};

use shopfront_core::OrderId;

use crate::error::{AppError, add_breadcrumb};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderDetail, Page, PageParams};
use crate::response::{self, ApiResponse};
use crate::services::OrderService;
use crate::services::orders::CreateOrderInput;
use crate::state::AppState;

/// `POST /api/orders`
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(input): AppJson<CreateOrderInput>,
) -> Result<ApiResponse<OrderDetail>, AppError> {
    let detail = OrderService::new(state.pool(), state.catalog_cache())
        .create_from_cart(user.id, &input, &state.config().pricing)
        .await?;

    info!(order_id = %detail.order.id, total = %detail.order.total, "Order placed");
    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_number", detail.order.order_number.as_str())]),
    );
    Ok(response::created(detail))
}

/// `GET /api/orders`
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<ApiResponse<Page<Order>>, AppError> {
    let page = OrderService::new(state.pool(), state.catalog_cache())
        .list_for_user(user.id, params)
        .await?;
    Ok(response::ok(page))
}

/// `GET /api/orders/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<OrderId>,
) -> Result<ApiResponse<OrderDetail>, AppError> {
    let detail = OrderService::new(state.pool(), state.catalog_cache())
        .detail_for_user(user.id, id)
        .await?;
    Ok(response::ok(detail))
}

/// `POST /api/orders/{id}/cancel`
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<OrderId>,
) -> Result<ApiResponse<OrderDetail>, AppError> {
    let detail = OrderService::new(state.pool(), state.catalog_cache())
        .cancel(user.id, id)
        .await?;
    info!("Order cancelled by customer");
    Ok(response::ok(detail))
}
