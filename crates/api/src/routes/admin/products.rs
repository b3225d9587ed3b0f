//! Admin product management.

use axum::extract::{Multipart, State, multipart::MultipartRejection};
use tracing::{info, instrument};

use shopfront_core::ProductId;

use super::uploads::read_image;
use crate::error::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::RequireStaff;
use crate::models::{Page, Product, ProductFilter, ProductInput, ProductUpdate, ProductView};
use crate::response::{self, ApiResponse, Message};
use crate::services::CatalogService;
use crate::services::uploads::{StoredUpload, store_image};
use crate::state::AppState;

/// `GET /api/admin/products` (includes inactive products)
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(_): RequireStaff,
    AppQuery(filter): AppQuery<ProductFilter>,
) -> Result<ApiResponse<Page<ProductView>>, AppError> {
    let page = CatalogService::new(state.pool(), state.catalog_cache())
        .admin_list_products(&filter)
        .await?;
    Ok(response::ok(page))
}

/// `POST /api/admin/products`
#[instrument(skip_all, fields(admin = %admin.id, name = %input.name))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(admin): RequireStaff,
    AppJson(input): AppJson<ProductInput>,
) -> Result<ApiResponse<Product>, AppError> {
    let product = CatalogService::new(state.pool(), state.catalog_cache())
        .create_product(&input)
        .await?;
    info!(product_id = %product.id, slug = %product.slug, "Product created");
    Ok(response::created(product))
}

/// `PUT /api/admin/products/{id}`
#[instrument(skip_all, fields(admin = %admin.id, product_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(admin): RequireStaff,
    AppPath(id): AppPath<ProductId>,
    AppJson(update): AppJson<ProductUpdate>,
) -> Result<ApiResponse<Product>, AppError> {
    let product = CatalogService::new(state.pool(), state.catalog_cache())
        .update_product(id, &update)
        .await?;
    info!("Product updated");
    Ok(response::ok(product))
}

/// `DELETE /api/admin/products/{id}`
#[instrument(skip_all, fields(admin = %admin.id, product_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(admin): RequireStaff,
    AppPath(id): AppPath<ProductId>,
) -> Result<ApiResponse<Message>, AppError> {
    CatalogService::new(state.pool(), state.catalog_cache())
        .delete_product(id)
        .await?;
    info!("Product deleted");
    Ok(response::message("Product deleted"))
}

/// Response for `POST /api/admin/products/{id}/images`.
#[derive(Debug, serde::Serialize)]
pub struct ProductImageUpload {
    pub upload: StoredUpload,
    pub product: Product,
}

/// `POST /api/admin/products/{id}/images`
///
/// Stores the uploaded image and appends its URL to the product.
#[instrument(skip_all, fields(admin = %admin.id, product_id = %id))]
pub async fn upload_image(
    State(state): State<AppState>,
    RequireStaff(admin): RequireStaff,
    AppPath(id): AppPath<ProductId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<ProductImageUpload>, AppError> {
    let catalog = CatalogService::new(state.pool(), state.catalog_cache());
    if !catalog.product_exists(id).await? {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    let image = read_image(multipart).await?;
    let config = state.config();
    let upload = store_image(
        &config.uploads,
        &config.base_url,
        image.content_type.as_deref(),
        &image.bytes,
    )
    .await?;

    let product = catalog.add_product_image(id, &upload.url).await?;
    Ok(response::created(ProductImageUpload { upload, product }))
}
