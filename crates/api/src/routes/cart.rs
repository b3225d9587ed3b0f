//! Cart route handlers.
//!
//! Every handler resolves the owner through [`CartContext`] and answers with
//! the full cart, so clients never need a second request to refresh it.

use axum::{extract::State, response::Response};
use serde::Deserialize;
use tracing::instrument;

use shopfront_core::ProductId;

use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::middleware::{CartContext, RequireAuth};
use crate::response;
use crate::services::CartService;
use crate::state::AppState;

/// `POST /api/cart/items` payload.
#[derive(Debug, Deserialize)]
pub struct AddItemInput {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// `PUT /api/cart/items/{product_id}` payload.
#[derive(Debug, Deserialize)]
pub struct UpdateItemInput {
    pub quantity: i32,
}

/// `GET /api/cart`
pub async fn show(State(state): State<AppState>, cart: CartContext) -> Result<Response, AppError> {
    let view = CartService::new(state.pool()).view(&cart.owner).await?;
    Ok(cart.respond(response::ok(view)))
}

/// `POST /api/cart/items`
#[instrument(skip_all, fields(product_id = %input.product_id, quantity = input.quantity))]
pub async fn add_item(
    State(state): State<AppState>,
    cart: CartContext,
    AppJson(input): AppJson<AddItemInput>,
) -> Result<Response, AppError> {
    let view = CartService::new(state.pool())
        .add(&cart.owner, input.product_id, input.quantity)
        .await?;
    Ok(cart.respond(response::ok(view)))
}

/// `PUT /api/cart/items/{product_id}`
#[instrument(skip_all, fields(product_id = %product_id, quantity = input.quantity))]
pub async fn update_item(
    State(state): State<AppState>,
    cart: CartContext,
    AppPath(product_id): AppPath<ProductId>,
    AppJson(input): AppJson<UpdateItemInput>,
) -> Result<Response, AppError> {
    let view = CartService::new(state.pool())
        .update(&cart.owner, product_id, input.quantity)
        .await?;
    Ok(cart.respond(response::ok(view)))
}

/// `DELETE /api/cart/items/{product_id}`
pub async fn remove_item(
    State(state): State<AppState>,
    cart: CartContext,
    AppPath(product_id): AppPath<ProductId>,
) -> Result<Response, AppError> {
    let view = CartService::new(state.pool())
        .remove(&cart.owner, product_id)
        .await?;
    Ok(cart.respond(response::ok(view)))
}

/// `DELETE /api/cart`
pub async fn clear(State(state): State<AppState>, cart: CartContext) -> Result<Response, AppError> {
    let view = CartService::new(state.pool()).clear(&cart.owner).await?;
    Ok(cart.respond(response::ok(view)))
}

/// `POST /api/cart/merge`
///
/// Moves the guest cart named by the session header or cookie into the
/// authenticated user's cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn merge(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    cart: CartContext,
) -> Result<Response, AppError> {
    let service = CartService::new(state.pool());
    let view = match cart.guest_session.as_deref() {
        Some(session) => service.merge(session, user.id).await?,
        None => service.view(&cart.owner).await?,
    };
    Ok(cart.respond(response::ok(view)))
}
