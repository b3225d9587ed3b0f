//! Offer domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopfront_core::pricing::OfferTerms;
use shopfront_core::{CategoryId, DiscountType, OfferId, ProductId};

/// A promotional discount on a product or on every product in a category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Offer {
    pub id: OfferId,
    pub title: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub product_id: Option<ProductId>,
    pub category_id: Option<CategoryId>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    /// The pricing-relevant part of the offer.
    #[must_use]
    pub const fn terms(&self) -> OfferTerms {
        OfferTerms {
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            is_active: self.is_active,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            usage_limit: self.usage_limit,
            used_count: self.used_count,
        }
    }

    /// Whether the offer targets the given product or its category.
    #[must_use]
    pub fn applies_to(&self, product_id: ProductId, category_id: Option<CategoryId>) -> bool {
        self.product_id == Some(product_id)
            || (self.category_id.is_some() && self.category_id == category_id)
    }
}

/// Payload for creating an offer.
#[derive(Debug, Clone, Deserialize)]
pub struct OfferInput {
    pub title: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub product_id: Option<ProductId>,
    pub category_id: Option<CategoryId>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub is_active: Option<bool>,
}

/// Partial offer update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<Decimal>,
    pub product_id: Option<ProductId>,
    pub category_id: Option<CategoryId>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub is_active: Option<bool>,
}
