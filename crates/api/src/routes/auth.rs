//! Authentication route handlers.
//!
//! Password registration and login issue a bearer token; the remaining
//! endpoints act on the authenticated caller.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{AppError, add_breadcrumb};
use crate::extract::AppJson;
use crate::middleware::RequireAuth;
use crate::models::{User, UserProfileUpdate};
use crate::response::{self, ApiResponse, Message};
use crate::services::AuthService;
use crate::services::auth::{IssuedToken, RegisterInput};
use crate::state::AppState;

/// Login payload.
#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Change password payload.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

/// A user together with a freshly issued token.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    #[serde(flatten)]
    pub token: IssuedToken,
}

/// `POST /api/auth/register`
#[instrument(skip_all, fields(email = %input.email))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(input): AppJson<RegisterInput>,
) -> Result<ApiResponse<AuthResponse>, AppError> {
    let user = AuthService::new(state.pool()).register(&input).await?;
    let token = state.tokens().issue(&user)?;

    info!(user_id = %user.id, "User registered");
    Ok(response::created(AuthResponse { user, token }))
}

/// `POST /api/auth/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(input): AppJson<LoginInput>,
) -> Result<ApiResponse<AuthResponse>, AppError> {
    let user = AuthService::new(state.pool())
        .login(&input.email, &input.password)
        .await?;
    let token = state.tokens().issue(&user)?;

    let user_id = user.id.to_string();
    add_breadcrumb("auth", "User logged in", Some(&[("user_id", user_id.as_str())]));
    Ok(response::ok(AuthResponse { user, token }))
}

/// `GET /api/auth/me`
pub async fn me(RequireAuth(user): RequireAuth) -> ApiResponse<User> {
    response::ok(user)
}

/// `PUT /api/auth/profile`
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(update): AppJson<UserProfileUpdate>,
) -> Result<ApiResponse<User>, AppError> {
    let user = AuthService::new(state.pool())
        .update_profile(user.id, &update)
        .await?;
    Ok(response::ok(user))
}

/// `POST /api/auth/change-password`
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(input): AppJson<ChangePasswordInput>,
) -> Result<ApiResponse<Message>, AppError> {
    AuthService::new(state.pool())
        .change_password(user.id, &input.current_password, &input.new_password)
        .await?;

    info!("Password changed");
    Ok(response::message("Password changed successfully"))
}

/// `POST /api/auth/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<AuthResponse>, AppError> {
    let token = state.tokens().issue(&user)?;
    Ok(response::ok(AuthResponse { user, token }))
}
