//! HTTP routes for the JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (database)
//! GET  /uploads/{file}                  - Uploaded images
//!
//! # Auth (rate limited)
//! POST /api/auth/register               - Create account, returns token
//! POST /api/auth/login                  - Login, returns token
//! GET  /api/auth/me                     - Current user
//! PUT  /api/auth/profile                - Update own profile
//! POST /api/auth/change-password        - Change own password
//! POST /api/auth/refresh                - Fresh token
//!
//! # Catalog
//! GET  /api/categories                  - Category tree
//! GET  /api/categories/{id}             - Category with children
//! GET  /api/products                    - Filtered, paginated listing
//! GET  /api/products/{id}               - Product detail
//! GET  /api/products/slug/{slug}        - Product detail by slug
//! GET  /api/products/{id}/offers        - Offers for a product
//! GET  /api/offers                      - Live offers
//!
//! # Cart (user or guest session)
//! GET    /api/cart                      - Cart contents
//! DELETE /api/cart                      - Clear cart
//! POST   /api/cart/items                - Add product
//! PUT    /api/cart/items/{product_id}   - Set quantity
//! DELETE /api/cart/items/{product_id}   - Remove product
//! POST   /api/cart/merge                - Merge guest cart into user cart
//!
//! # Orders, coupons, wishlist, payments (auth required except validate)
//! POST /api/orders                      - Checkout
//! GET  /api/orders                      - Order history
//! GET  /api/orders/{id}                 - Order detail
//! POST /api/orders/{id}/cancel          - Cancel order
//! POST /api/coupons/validate            - Preview a coupon
//! GET|POST /api/wishlist                - List / add
//! DELETE /api/wishlist/{product_id}     - Remove
//! POST /api/payments/create-intent      - Stripe payment intent
//! POST /api/payments/confirm            - Confirm payment
//! GET  /api/payments/{payment_intent_id} - Payment status
//!
//! # Admin (staff only)
//! /api/admin/...                        - See [`admin`]
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod coupons;
pub mod orders;
pub mod payments;
pub mod products;
pub mod wishlist;

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::error::AppError;
use crate::middleware::{
    auth_rate_limiter, cors_layer, rate_limit_envelope, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/profile", put(auth::update_profile))
        .route("/change-password", post(auth::change_password))
        .route("/refresh", post(auth::refresh))
        .layer(auth_rate_limiter())
        .layer(middleware::from_fn(rate_limit_envelope))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(categories::index))
        .route("/categories/{id}", get(categories::show))
        .route("/products", get(products::index))
        .route("/products/slug/{slug}", get(products::show_by_slug))
        .route("/products/{id}", get(products::show))
        .route("/products/{id}/offers", get(products::offers))
        .route("/offers", get(products::live_offers))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{product_id}",
            put(cart::update_item).delete(cart::remove_item),
        )
        .route("/merge", post(cart::merge))
}

/// Create the order, coupon, wishlist and payment routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::index).post(orders::create))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/cancel", post(orders::cancel))
        .route("/coupons/validate", post(coupons::validate))
        .route("/wishlist", get(wishlist::index).post(wishlist::add))
        .route("/wishlist/{product_id}", delete(wishlist::remove))
        .route("/payments/create-intent", post(payments::create_intent))
        .route("/payments/confirm", post(payments::confirm))
        .route("/payments/{payment_intent_id}", get(payments::status))
}

/// Create all `/api` routes.
pub fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/cart", cart_routes())
        .nest("/admin", admin::routes(max_upload_bytes))
        .merge(catalog_routes())
        .merge(checkout_routes())
}

/// Build the complete application with its middleware stack.
pub fn app(state: AppState) -> Router {
    let config = state.config();
    let api = api_routes(config.uploads.max_bytes);
    let uploads = ServeDir::new(&config.uploads.dir);
    let cors = cors_layer(&config.cors);

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api)
        .nest_service("/uploads", uploads)
        .fallback(not_found)
        .layer(cors)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
                user_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, header},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::state::test_state;

    async fn send(method: Method, uri: &str, token: Option<&str>, body: Option<&str>) -> Response {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-real-ip", "203.0.113.9");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        app(test_state())
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap()
    }

    async fn json(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = send(Method::GET, "/health", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        for uri in ["/api/admin/products", "/api/admin/users/1", "/api/admin/orders"] {
            let response = send(Method::GET, uri, None, None).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
            let body = json(response).await;
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], "Authentication required");
        }
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected() {
        let response = send(Method::GET, "/api/auth/me", Some("not.a.jwt"), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(Method::DELETE, "/api/admin/products/1", Some("not.a.jwt"), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_auth_required_for_orders_and_wishlist() {
        for (method, uri) in [
            (Method::GET, "/api/orders"),
            (Method::POST, "/api/orders/1/cancel"),
            (Method::GET, "/api/wishlist"),
            (Method::POST, "/api/payments/create-intent"),
            (Method::POST, "/api/cart/merge"),
        ] {
            let response = send(method, uri, None, None).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_bad_path_parameter_uses_envelope() {
        let response = send(Method::GET, "/api/products/not-a-number", None, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_cart_add_rejects_malformed_body() {
        let response = send(Method::POST, "/api/cart/items", None, Some(r#"{"quantity": 2}"#)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let response = send(Method::GET, "/api/nope", None, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(response).await["error"], "Route not found");
    }

    #[tokio::test]
    async fn test_responses_carry_request_id_and_security_headers() {
        let response = send(Method::GET, "/api/nope", None, None).await;
        let headers = response.headers();
        assert!(headers.contains_key("x-request-id"));
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    }
}
