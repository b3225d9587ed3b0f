//! Admin user management.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use shopfront_core::UserId;

use crate::error::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::{RequireStaff, RequireSuperuser};
use crate::models::{Page, PageParams, User, UserFlagsUpdate};
use crate::response::{self, ApiResponse, Message};
use crate::services::UserAdminService;
use crate::state::AppState;

/// `GET /api/admin/users` query.
#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// `GET /api/admin/users`
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
    AppQuery(query): AppQuery<UserListQuery>,
) -> Result<ApiResponse<Page<User>>, AppError> {
    let params = PageParams {
        page: query.page,
        per_page: query.per_page,
    };
    let page = UserAdminService::new(state.pool())
        .list(query.search.as_deref(), params)
        .await?;
    Ok(response::ok(page))
}

/// `GET /api/admin/users/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
    AppPath(id): AppPath<UserId>,
) -> Result<ApiResponse<User>, AppError> {
    let user = UserAdminService::new(state.pool()).get(id).await?;
    Ok(response::ok(user))
}

/// `PUT /api/admin/users/{id}`
#[instrument(skip_all, fields(admin = %admin.id, user_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(admin): RequireStaff,
    AppPath(id): AppPath<UserId>,
    AppJson(update): AppJson<UserFlagsUpdate>,
) -> Result<ApiResponse<User>, AppError> {
    let user = UserAdminService::new(state.pool())
        .update_flags(&admin, id, &update)
        .await?;
    Ok(response::ok(user))
}

/// `DELETE /api/admin/users/{id}`
#[instrument(skip_all, fields(admin = %admin.id, user_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireSuperuser(admin): RequireSuperuser,
    AppPath(id): AppPath<UserId>,
) -> Result<ApiResponse<Message>, AppError> {
    UserAdminService::new(state.pool()).delete(&admin, id).await?;
    Ok(response::message("User deleted"))
}
