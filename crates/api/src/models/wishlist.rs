//! Wishlist domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;

use shopfront_core::{ProductId, WishlistItemId};

/// A saved product with a summary of the product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WishlistEntry {
    pub id: WishlistItemId,
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    pub images: Json<Vec<String>>,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
