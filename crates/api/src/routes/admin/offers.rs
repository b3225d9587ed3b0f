//! Admin offer management.

use axum::extract::State;
use tracing::{info, instrument};

use shopfront_core::OfferId;

use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::middleware::RequireStaff;
use crate::models::{Offer, OfferInput, OfferUpdate};
use crate::response::{self, ApiResponse, Message};
use crate::services::OfferService;
use crate::state::AppState;

/// `GET /api/admin/offers` (all offers, including expired ones)
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
) -> Result<ApiResponse<Vec<Offer>>, AppError> {
    let offers = OfferService::new(state.pool(), state.catalog_cache())
        .list_all()
        .await?;
    Ok(response::ok(offers))
}

/// `GET /api/admin/offers/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
    AppPath(id): AppPath<OfferId>,
) -> Result<ApiResponse<Offer>, AppError> {
    let offer = OfferService::new(state.pool(), state.catalog_cache())
        .get(id)
        .await?;
    Ok(response::ok(offer))
}

/// `POST /api/admin/offers`
#[instrument(skip_all, fields(admin = %admin.id, title = %input.title))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(admin): RequireStaff,
    AppJson(input): AppJson<OfferInput>,
) -> Result<ApiResponse<Offer>, AppError> {
    let offer = OfferService::new(state.pool(), state.catalog_cache())
        .create(&input)
        .await?;
    info!(offer_id = %offer.id, "Offer created");
    Ok(response::created(offer))
}

/// `PUT /api/admin/offers/{id}`
#[instrument(skip_all, fields(admin = %admin.id, offer_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(admin): RequireStaff,
    AppPath(id): AppPath<OfferId>,
    AppJson(update): AppJson<OfferUpdate>,
) -> Result<ApiResponse<Offer>, AppError> {
    let offer = OfferService::new(state.pool(), state.catalog_cache())
        .update(id, &update)
        .await?;
    Ok(response::ok(offer))
}

/// `DELETE /api/admin/offers/{id}`
#[instrument(skip_all, fields(admin = %admin.id, offer_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(admin): RequireStaff,
    AppPath(id): AppPath<OfferId>,
) -> Result<ApiResponse<Message>, AppError> {
    OfferService::new(state.pool(), state.catalog_cache())
        .delete(id)
        .await?;
    Ok(response::message("Offer deleted"))
}
