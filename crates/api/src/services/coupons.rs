//! Coupon service: shopper-side validation and admin management.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use shopfront_core::pricing::CouponRejection;
use shopfront_core::{CouponId, CouponType};

use crate::db::{CouponRepository, RepositoryError};
use crate::models::coupon::normalize_code;
use crate::models::{Coupon, CouponInput, CouponUpdate, Page, PageParams};

/// Longest accepted coupon code.
const MAX_CODE_LENGTH: usize = 50;

/// Errors from coupon operations.
#[derive(Debug, Error)]
pub enum CouponError {
    #[error("Coupon not found")]
    NotFound,

    #[error("{0}")]
    Rejected(#[from] CouponRejection),

    #[error("{0}")]
    Invalid(String),

    #[error("Coupon code already exists")]
    Conflict,

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CouponError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(_) => Self::Conflict,
            other => Self::Repository(other),
        }
    }
}

/// `POST /api/coupons/validate` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateCouponInput {
    pub code: String,
    pub subtotal: Decimal,
}

/// What a coupon would take off a subtotal.
#[derive(Debug, Clone, Serialize)]
pub struct CouponValidation {
    pub code: String,
    pub discount_type: CouponType,
    pub discount_amount: Decimal,
    pub free_shipping: bool,
}

/// Coupon service.
pub struct CouponService<'a> {
    coupons: CouponRepository<'a>,
}

impl<'a> CouponService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            coupons: CouponRepository::new(pool),
        }
    }

    /// Check a code against a cart subtotal.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::NotFound` for an unknown code and
    /// `CouponError::Rejected` when the coupon does not apply.
    pub async fn validate(&self, input: &ValidateCouponInput) -> Result<CouponValidation, CouponError> {
        if input.subtotal.is_sign_negative() {
            return Err(CouponError::Invalid("Subtotal cannot be negative".to_string()));
        }

        let code = normalize_code(&input.code);
        if code.is_empty() {
            return Err(CouponError::Invalid("Coupon code is required".to_string()));
        }

        let coupon = self
            .coupons
            .get_by_code(&code)
            .await?
            .ok_or(CouponError::NotFound)?;
        let discount = coupon.terms().apply(input.subtotal, Utc::now())?;

        Ok(CouponValidation {
            code: coupon.code,
            discount_type: coupon.discount_type,
            discount_amount: discount.amount,
            free_shipping: discount.free_shipping,
        })
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// All coupons, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::Repository` if the query fails.
    pub async fn list(&self, params: PageParams) -> Result<Page<Coupon>, CouponError> {
        let (coupons, total) = self.coupons.list(params).await?;
        Ok(Page::new(coupons, total, params))
    }

    /// A coupon by ID.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::NotFound` if the coupon does not exist.
    pub async fn get(&self, id: CouponId) -> Result<Coupon, CouponError> {
        self.coupons.get_by_id(id).await?.ok_or(CouponError::NotFound)
    }

    /// Create a coupon.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::Invalid` for bad input and `CouponError::Conflict`
    /// for a duplicate code.
    pub async fn create(&self, input: &CouponInput) -> Result<Coupon, CouponError> {
        let mut input = input.clone();
        input.code = checked_code(&input.code)?;
        validate_terms(&Terms {
            discount_type: input.discount_type,
            discount_value: input.discount_value,
            min_order_amount: input.min_order_amount,
            max_discount_amount: input.max_discount_amount,
            usage_limit: input.usage_limit,
            starts_at: input.starts_at,
            expires_at: input.expires_at,
        })?;

        Ok(self.coupons.create(&input).await?)
    }

    /// Apply a partial update, validating the coupon as it would be after it.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::NotFound`, `CouponError::Invalid` or
    /// `CouponError::Conflict`.
    pub async fn update(&self, id: CouponId, update: &CouponUpdate) -> Result<Coupon, CouponError> {
        let current = self.get(id).await?;

        let mut update = update.clone();
        if let Some(code) = update.code.as_deref() {
            update.code = Some(checked_code(code)?);
        }
        validate_terms(&Terms {
            discount_type: update.discount_type.unwrap_or(current.discount_type),
            discount_value: update.discount_value.unwrap_or(current.discount_value),
            min_order_amount: update.min_order_amount.or(current.min_order_amount),
            max_discount_amount: update.max_discount_amount.or(current.max_discount_amount),
            usage_limit: update.usage_limit.or(current.usage_limit),
            starts_at: update.starts_at.or(current.starts_at),
            expires_at: update.expires_at.or(current.expires_at),
        })?;

        Ok(self.coupons.update(id, &update).await?)
    }

    /// Delete a coupon.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::NotFound` if the coupon does not exist.
    pub async fn delete(&self, id: CouponId) -> Result<(), CouponError> {
        Ok(self.coupons.delete(id).await?)
    }
}

/// Coupon fields that must be consistent with each other.
struct Terms {
    discount_type: CouponType,
    discount_value: Decimal,
    min_order_amount: Option<Decimal>,
    max_discount_amount: Option<Decimal>,
    usage_limit: Option<i32>,
    starts_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
}

fn checked_code(code: &str) -> Result<String, CouponError> {
    let code = normalize_code(code);
    if code.is_empty() {
        return Err(CouponError::Invalid("Coupon code is required".to_string()));
    }
    if code.len() > MAX_CODE_LENGTH
        || !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CouponError::Invalid(format!(
            "Coupon code must be up to {MAX_CODE_LENGTH} letters, digits, '-' or '_'"
        )));
    }
    Ok(code)
}

fn validate_terms(terms: &Terms) -> Result<(), CouponError> {
    let invalid = |msg: &str| Err(CouponError::Invalid(msg.to_string()));

    match terms.discount_type {
        CouponType::Percentage
            if terms.discount_value <= Decimal::ZERO || terms.discount_value > Decimal::ONE_HUNDRED =>
        {
            return invalid("Percentage discount must be greater than 0 and at most 100");
        }
        CouponType::Fixed if terms.discount_value <= Decimal::ZERO => {
            return invalid("Fixed discount must be greater than 0");
        }
        _ => {}
    }

    if terms.min_order_amount.is_some_and(|m| m.is_sign_negative()) {
        return invalid("Minimum order amount cannot be negative");
    }
    if terms.max_discount_amount.is_some_and(|m| m <= Decimal::ZERO) {
        return invalid("Maximum discount amount must be greater than 0");
    }
    if terms.usage_limit.is_some_and(|l| l < 1) {
        return invalid("Usage limit must be at least 1");
    }
    if let (Some(starts), Some(expires)) = (terms.starts_at, terms.expires_at)
        && expires <= starts
    {
        return invalid("Expiry must be after the start date");
    }
    Ok(())
}
