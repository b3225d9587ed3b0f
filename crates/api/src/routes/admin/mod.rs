//! Admin API (`/api/admin`).
//!
//! Every handler takes [`RequireStaff`](crate::middleware::RequireStaff) or
//! [`RequireSuperuser`](crate::middleware::RequireSuperuser), so the whole
//! tree answers 401 without a token and 403 for shopper tokens.

pub mod categories;
pub mod coupons;
pub mod offers;
pub mod orders;
pub mod products;
pub mod uploads;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the admin routes router.
///
/// `max_upload_bytes` bounds the request body of the upload endpoints.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    let upload_limit = DefaultBodyLimit::max(max_upload_bytes.saturating_add(MULTIPART_OVERHEAD));

    Router::new()
        .route("/products", get(products::index).post(products::create))
        .route(
            "/products/{id}",
            put(products::update).delete(products::delete),
        )
        .route(
            "/products/{id}/images",
            post(products::upload_image).layer(upload_limit),
        )
        .route(
            "/categories",
            get(categories::index).post(categories::create),
        )
        .route(
            "/categories/{id}",
            put(categories::update).delete(categories::delete),
        )
        .route("/users", get(users::index))
        .route(
            "/users/{id}",
            get(users::show).put(users::update).delete(users::delete),
        )
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", put(orders::update_status))
        .route("/coupons", get(coupons::index).post(coupons::create))
        .route(
            "/coupons/{id}",
            get(coupons::show)
                .put(coupons::update)
                .delete(coupons::delete),
        )
        .route("/offers", get(offers::index).post(offers::create))
        .route(
            "/offers/{id}",
            get(offers::show).put(offers::update).delete(offers::delete),
        )
        .route("/uploads", post(uploads::upload).layer(upload_limit))
}
