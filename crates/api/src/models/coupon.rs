//! Coupon domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopfront_core::pricing::CouponTerms;
use shopfront_core::{CouponId, CouponType};

/// A discount code applied at checkout.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Coupon {
    pub id: CouponId,
    /// Always stored uppercase.
    pub code: String,
    pub description: Option<String>,
    pub discount_type: CouponType,
    pub discount_value: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_discount_amount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// The pricing-relevant part of the coupon.
    #[must_use]
    pub const fn terms(&self) -> CouponTerms {
        CouponTerms {
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            min_order_amount: self.min_order_amount,
            max_discount_amount: self.max_discount_amount,
            usage_limit: self.usage_limit,
            used_count: self.used_count,
            is_active: self.is_active,
            starts_at: self.starts_at,
            expires_at: self.expires_at,
        }
    }
}

/// Normalize a coupon code for storage and lookup.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Payload for creating a coupon.
#[derive(Debug, Clone, Deserialize)]
pub struct CouponInput {
    pub code: String,
    pub description: Option<String>,
    pub discount_type: CouponType,
    #[serde(default)]
    pub discount_value: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_discount_amount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub is_active: Option<bool>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Partial coupon update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponUpdate {
    pub code: Option<String>,
    pub description: Option<String>,
    pub discount_type: Option<CouponType>,
    pub discount_value: Option<Decimal>,
    pub min_order_amount: Option<Decimal>,
    pub max_discount_amount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub is_active: Option<bool>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  save10 "), "SAVE10");
    }
}
