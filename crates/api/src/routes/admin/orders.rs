//! Admin order management.

use axum::extract::State;
use serde::Deserialize;
use tracing::{info, instrument};

use shopfront_core::{OrderId, OrderStatus};

use crate::error::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::RequireStaff;
use crate::models::{Order, OrderDetail, Page, PageParams};
use crate::response::{self, ApiResponse};
use crate::services::OrderService;
use crate::state::AppState;

/// `GET /api/admin/orders` query.
#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// `PUT /api/admin/orders/{id}/status` payload.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// `GET /api/admin/orders`
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
    AppQuery(query): AppQuery<OrderListQuery>,
) -> Result<ApiResponse<Page<Order>>, AppError> {
    let params = PageParams {
        page: query.page,
        per_page: query.per_page,
    };
    let page = OrderService::new(state.pool(), state.catalog_cache())
        .admin_list(query.status, params)
        .await?;
    Ok(response::ok(page))
}

/// `GET /api/admin/orders/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
    AppPath(id): AppPath<OrderId>,
) -> Result<ApiResponse<OrderDetail>, AppError> {
    let detail = OrderService::new(state.pool(), state.catalog_cache())
        .admin_detail(id)
        .await?;
    Ok(response::ok(detail))
}

/// `PUT /api/admin/orders/{id}/status`
#[instrument(skip_all, fields(admin = %admin.id, order_id = %id, status = input.status.as_str()))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireStaff(admin): RequireStaff,
    AppPath(id): AppPath<OrderId>,
    AppJson(input): AppJson<StatusUpdate>,
) -> Result<ApiResponse<OrderDetail>, AppError> {
    let detail = OrderService::new(state.pool(), state.catalog_cache())
        .admin_set_status(id, input.status)
        .await?;
    info!("Order status updated");
    Ok(response::ok(detail))
}
