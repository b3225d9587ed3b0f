//! Product route handlers.
//!
//! Public reads only; writes live under `/api/admin/products`.

use std::sync::Arc;

use axum::extract::State;
use tracing::instrument;

use shopfront_core::ProductId;

use crate::error::AppError;
use crate::extract::{AppPath, AppQuery};
use crate::models::{Offer, Page, ProductFilter, ProductView};
use crate::response::{self, ApiResponse};
use crate::services::{CatalogService, OfferService};
use crate::state::AppState;

/// `GET /api/products`
#[instrument(skip_all, fields(search = ?filter.search, category_id = ?filter.category_id))]
pub async fn index(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<ProductFilter>,
) -> Result<ApiResponse<Arc<Page<ProductView>>>, AppError> {
    let page = CatalogService::new(state.pool(), state.catalog_cache())
        .list_products(&filter)
        .await?;
    Ok(response::ok(page))
}

/// `GET /api/products/{id}`
pub async fn show(
    State(state): State<AppState>,
    AppPath(id): AppPath<ProductId>,
) -> Result<ApiResponse<Arc<ProductView>>, AppError> {
    let product = CatalogService::new(state.pool(), state.catalog_cache())
        .product(id)
        .await?;
    Ok(response::ok(product))
}

/// `GET /api/products/slug/{slug}`
pub async fn show_by_slug(
    State(state): State<AppState>,
    AppPath(slug): AppPath<String>,
) -> Result<ApiResponse<Arc<ProductView>>, AppError> {
    let product = CatalogService::new(state.pool(), state.catalog_cache())
        .product_by_slug(&slug)
        .await?;
    Ok(response::ok(product))
}

/// `GET /api/products/{id}/offers`
pub async fn offers(
    State(state): State<AppState>,
    AppPath(id): AppPath<ProductId>,
) -> Result<ApiResponse<Vec<Offer>>, AppError> {
    let offers = CatalogService::new(state.pool(), state.catalog_cache())
        .product_offers(id)
        .await?;
    Ok(response::ok(offers))
}

/// `GET /api/offers`
pub async fn live_offers(State(state): State<AppState>) -> Result<ApiResponse<Vec<Offer>>, AppError> {
    let offers = OfferService::new(state.pool(), state.catalog_cache())
        .live()
        .await?;
    Ok(response::ok(offers))
}
