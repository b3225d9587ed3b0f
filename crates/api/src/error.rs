//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Service errors convert into
//! `AppError` with `?`, and the response is always the JSON envelope
//! `{"success": false, "error": "..."}`. Server-side failures (5xx) are
//! captured to Sentry and logged; clients only see a generic message.

use axum::{
    Json,
    extract::multipart::MultipartError,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::{
    CartError, CatalogError, CouponError, OrderError, PaymentError, UploadError, UserAdminError,
};
use crate::stripe::StripeError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Coupon error: {0}")]
    Coupon(#[from] CouponError),

    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("User admin error: {0}")]
    UserAdmin(#[from] UserAdminError),

    /// Request body was not valid JSON for the endpoint.
    #[error("Invalid JSON body: {0}")]
    Json(#[from] JsonRejection),

    /// Query string could not be parsed.
    #[error("Invalid query string: {0}")]
    Query(#[from] QueryRejection),

    /// Path parameter could not be parsed.
    #[error("Invalid path parameter: {0}")]
    Path(#[from] PathRejection),

    /// Multipart body could not be read.
    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Auth(err) => auth_status(err),
            Self::Catalog(err) => match err {
                CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::Invalid(_) => StatusCode::BAD_REQUEST,
                CatalogError::Conflict(_) => StatusCode::CONFLICT,
                CatalogError::Repository(err) => repository_status(err),
            },
            Self::Cart(err) => match err {
                CartError::ProductNotFound | CartError::ItemNotFound => StatusCode::NOT_FOUND,
                CartError::InvalidQuantity | CartError::InsufficientStock { .. } => {
                    StatusCode::BAD_REQUEST
                }
                CartError::Repository(err) => repository_status(err),
            },
            Self::Order(err) => match err {
                OrderError::NotFound => StatusCode::NOT_FOUND,
                OrderError::Forbidden => StatusCode::FORBIDDEN,
                OrderError::StockConflict => StatusCode::CONFLICT,
                OrderError::Repository(err) => repository_status(err),
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Coupon(err) => match err {
                CouponError::NotFound => StatusCode::NOT_FOUND,
                CouponError::Rejected(_) | CouponError::Invalid(_) => StatusCode::BAD_REQUEST,
                CouponError::Conflict => StatusCode::CONFLICT,
                CouponError::Repository(err) => repository_status(err),
            },
            Self::Payment(err) => match err {
                PaymentError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
                PaymentError::OrderNotFound | PaymentError::IntentNotFound => StatusCode::NOT_FOUND,
                PaymentError::Stripe(StripeError::InvalidId) => StatusCode::BAD_REQUEST,
                PaymentError::Stripe(_) => StatusCode::BAD_GATEWAY,
                PaymentError::Repository(err) => repository_status(err),
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Upload(err) => match err {
                UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::UserAdmin(err) => match err {
                UserAdminError::NotFound => StatusCode::NOT_FOUND,
                UserAdminError::Forbidden(_) => StatusCode::FORBIDDEN,
                UserAdminError::Invalid(_) => StatusCode::BAD_REQUEST,
                UserAdminError::InUse => StatusCode::CONFLICT,
                UserAdminError::Repository(err) => repository_status(err),
            },
            Self::Json(rejection) => rejection.status(),
            Self::Query(rejection) => rejection.status(),
            Self::Path(rejection) => rejection.status(),
            Self::Multipart(err) => err.status(),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to the client.
    fn public_message(&self, status: StatusCode) -> String {
        // Don't expose internal error details to clients
        if status.is_server_error() {
            return match status {
                StatusCode::BAD_GATEWAY => "Payment provider error".to_string(),
                StatusCode::SERVICE_UNAVAILABLE => self.inner_message(),
                _ => "Internal server error".to_string(),
            };
        }
        self.inner_message()
    }

    fn inner_message(&self) -> String {
        match self {
            Self::Database(err) => repository_message(err),
            Self::Auth(err) => auth_message(err),
            Self::Catalog(CatalogError::Repository(err))
            | Self::Cart(CartError::Repository(err))
            | Self::Coupon(CouponError::Repository(err))
            | Self::Payment(PaymentError::Repository(err))
            | Self::UserAdmin(UserAdminError::Repository(err)) => repository_message(err),
            Self::Order(OrderError::Repository(err)) => repository_message(err),
            Self::Catalog(err) => err.to_string(),
            Self::Cart(err) => err.to_string(),
            Self::Order(err) => err.to_string(),
            Self::Coupon(err) => err.to_string(),
            Self::Payment(err) => err.to_string(),
            Self::Upload(err) => err.to_string(),
            Self::UserAdmin(err) => err.to_string(),
            Self::Json(rejection) => rejection.body_text(),
            Self::Query(rejection) => rejection.body_text(),
            Self::Path(rejection) => rejection.body_text(),
            Self::Multipart(err) => err.body_text(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Internal(msg) => msg.clone(),
            Self::RateLimited => "Too many requests, please try again later".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = json!({
            "success": false,
            "error": self.public_message(status),
        });
        (status, Json(body)).into_response()
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn repository_message(err: &RepositoryError) -> String {
    match err {
        RepositoryError::NotFound => "Not found".to_string(),
        RepositoryError::Conflict(msg) => {
            let mut chars = msg.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        }
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            "Internal server error".to_string()
        }
    }
}

const fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::TokenExpired => {
            StatusCode::UNAUTHORIZED
        }
        AuthError::AccountDisabled => StatusCode::FORBIDDEN,
        AuthError::UserNotFound => StatusCode::NOT_FOUND,
        AuthError::UserAlreadyExists => StatusCode::CONFLICT,
        AuthError::Repository(err) => repository_status(err),
        AuthError::TokenSigning(_) | AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn auth_message(err: &AuthError) -> String {
    match err {
        AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
        AuthError::InvalidCredentials => "Invalid email or password".to_string(),
        AuthError::AccountDisabled => "Account is disabled".to_string(),
        AuthError::UserNotFound => "User not found".to_string(),
        AuthError::UserAlreadyExists => "User with this email already exists".to_string(),
        AuthError::WeakPassword(msg) => msg.clone(),
        AuthError::InvalidToken => "Invalid or missing token".to_string(),
        AuthError::TokenExpired => "Token has expired".to_string(),
        AuthError::Repository(err) => repository_message(err),
        AuthError::TokenSigning(_) | AuthError::PasswordHash => {
            "Internal server error".to_string()
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order placed", Some(&[("order_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
