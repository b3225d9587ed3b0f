//! Wishlist route handlers.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use shopfront_core::ProductId;

use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::middleware::RequireAuth;
use crate::models::WishlistEntry;
use crate::response::{self, ApiResponse, Message};
use crate::services::WishlistService;
use crate::state::AppState;

/// `POST /api/wishlist` payload.
#[derive(Debug, Deserialize)]
pub struct AddToWishlistInput {
    pub product_id: ProductId,
}

/// `GET /api/wishlist`
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<Vec<WishlistEntry>>, AppError> {
    let items = WishlistService::new(state.pool()).list(user.id).await?;
    Ok(response::ok(items))
}

/// `POST /api/wishlist`
#[instrument(skip_all, fields(user_id = %user.id, product_id = %input.product_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(input): AppJson<AddToWishlistInput>,
) -> Result<ApiResponse<Message>, AppError> {
    WishlistService::new(state.pool())
        .add(user.id, input.product_id)
        .await?;
    Ok(response::created(Message {
        message: "Product added to wishlist",
    }))
}

/// `DELETE /api/wishlist/{product_id}`
#[instrument(skip_all, fields(user_id = %user.id, product_id = %product_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(product_id): AppPath<ProductId>,
) -> Result<ApiResponse<Message>, AppError> {
    WishlistService::new(state.pool())
        .remove(user.id, product_id)
        .await?;
    Ok(response::message("Product removed from wishlist"))
}
