//! Cart domain types.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;

use shopfront_core::{CartItemId, CategoryId, ProductId, UserId};

/// Whoever a cart belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOwner {
    /// A signed-in user.
    User(UserId),
    /// A guest identified by a session ID.
    Guest(String),
}

impl CartOwner {
    /// `(user_id, session_id)` bind values, exactly one of which is set.
    #[must_use]
    pub fn keys(&self) -> (Option<UserId>, Option<&str>) {
        match self {
            Self::User(id) => (Some(*id), None),
            Self::Guest(session) => (None, Some(session.as_str())),
        }
    }
}

/// A cart row joined with its product.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    pub category_id: Option<CategoryId>,
    pub images: Json<Vec<String>>,
    pub stock_quantity: i32,
    pub is_active: bool,
}

/// A priced cart line.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
    pub stock_quantity: i32,
}

/// The cart as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    /// Guest session the cart is stored under; absent for signed-in users.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub items: Vec<CartLine>,
    pub item_count: i64,
    pub subtotal: Decimal,
}
