//! Database operations for the Shopfront `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Shoppers and staff accounts
//! - `categories` - Category tree (self-referencing `parent_id`)
//! - `products` - Catalog with price, stock and image URLs
//! - `cart` - Cart rows owned by a user or a guest session
//! - `coupons` / `offers` - Order-level and product-level discounts
//! - `orders` / `order_items` - Placed orders with price snapshots
//! - `wishlist` - Saved products per user
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p shopfront-cli -- migrate
//! ```
//!
//! Queries are built at runtime with `sqlx::query_as` and bound parameters;
//! repositories never interpolate user input into SQL.

pub mod cart;
pub mod categories;
pub mod coupons;
pub mod offers;
pub mod orders;
pub mod products;
pub mod users;
pub mod wishlist;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use cart::CartRepository;
pub use categories::CategoryRepository;
pub use coupons::CouponRepository;
pub use offers::OfferRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::UserRepository;
pub use wishlist::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database failed validation.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Record not found.
    #[error("not found")]
    NotFound,

    /// A unique or referential constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique and foreign-key violations to [`RepositoryError::Conflict`].
    ///
    /// `what` names the conflicting value in the resulting message, e.g.
    /// "slug already exists".
    pub(crate) fn from_constraint(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return Self::Conflict(format!("{what} already exists"));
            }
            if db_err.is_foreign_key_violation() {
                return Self::Conflict(format!("{what} is still referenced"));
            }
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Offset for a 1-based page number.
#[must_use]
pub(crate) fn page_offset(page: u32, per_page: u32) -> i64 {
    i64::from(page.saturating_sub(1)) * i64::from(per_page)
}
