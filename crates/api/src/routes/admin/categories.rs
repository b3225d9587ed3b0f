//! Admin category management.

use axum::extract::State;
use tracing::{info, instrument};

use shopfront_core::CategoryId;

use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::middleware::RequireStaff;
use crate::models::{Category, CategoryInput, CategoryUpdate};
use crate::response::{self, ApiResponse, Message};
use crate::services::CatalogService;
use crate::state::AppState;

/// `GET /api/admin/categories` (flat, includes inactive categories)
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
) -> Result<ApiResponse<Vec<Category>>, AppError> {
    let categories = CatalogService::new(state.pool(), state.catalog_cache())
        .admin_list_categories()
        .await?;
    Ok(response::ok(categories))
}

/// `POST /api/admin/categories`
#[instrument(skip_all, fields(admin = %admin.id, name = %input.name))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(admin): RequireStaff,
    AppJson(input): AppJson<CategoryInput>,
) -> Result<ApiResponse<Category>, AppError> {
    let category = CatalogService::new(state.pool(), state.catalog_cache())
        .create_category(&input)
        .await?;
    info!(category_id = %category.id, "Category created");
    Ok(response::created(category))
}

/// `PUT /api/admin/categories/{id}`
#[instrument(skip_all, fields(admin = %admin.id, category_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(admin): RequireStaff,
    AppPath(id): AppPath<CategoryId>,
    AppJson(update): AppJson<CategoryUpdate>,
) -> Result<ApiResponse<Category>, AppError> {
    let category = CatalogService::new(state.pool(), state.catalog_cache())
        .update_category(id, &update)
        .await?;
    Ok(response::ok(category))
}

/// `DELETE /api/admin/categories/{id}`
#[instrument(skip_all, fields(admin = %admin.id, category_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(admin): RequireStaff,
    AppPath(id): AppPath<CategoryId>,
) -> Result<ApiResponse<Message>, AppError> {
    CatalogService::new(state.pool(), state.catalog_cache())
        .delete_category(id)
        .await?;
    info!("Category deleted");
    Ok(response::message("Category deleted"))
}
