//! Category route handlers.

use std::sync::Arc;

use axum::extract::State;

use shopfront_core::CategoryId;

use crate::error::AppError;
use crate::extract::AppPath;
use crate::models::CategoryNode;
use crate::response::{self, ApiResponse};
use crate::services::CatalogService;
use crate::services::catalog::CategoryDetail;
use crate::state::AppState;

/// `GET /api/categories`
pub async fn index(
    State(state): State<AppState>,
) -> Result<ApiResponse<Arc<Vec<CategoryNode>>>, AppError> {
    let tree = CatalogService::new(state.pool(), state.catalog_cache())
        .category_tree()
        .await?;
    Ok(response::ok(tree))
}

/// `GET /api/categories/{id}`
pub async fn show(
    State(state): State<AppState>,
    AppPath(id): AppPath<CategoryId>,
) -> Result<ApiResponse<CategoryDetail>, AppError> {
    let category = CatalogService::new(state.pool(), state.catalog_cache())
        .category(id)
        .await?;
    Ok(response::ok(category))
}
