//! Coupon repository.

use sqlx::{PgConnection, PgPool};

use shopfront_core::CouponId;

use super::{RepositoryError, page_offset};
use crate::models::{Coupon, CouponInput, CouponUpdate, PageParams};

const COUPON_COLUMNS: &str = "id, code, description, discount_type, discount_value, \
     min_order_amount, max_discount_amount, usage_limit, used_count, is_active, \
     starts_at, expires_at, created_at, updated_at";

/// Repository for coupon database operations.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up a coupon by its normalized (uppercase) code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(coupon)
    }

    /// Get a coupon by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: CouponId) -> Result<Option<Coupon>, RepositoryError> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(coupon)
    }

    /// List coupons, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, params: PageParams) -> Result<(Vec<Coupon>, i64), RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coupons")
            .fetch_one(self.pool)
            .await?;

        let coupons = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons
             ORDER BY created_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(params.per_page()))
        .bind(page_offset(params.page(), params.per_page()))
        .fetch_all(self.pool)
        .await?;

        Ok((coupons, total))
    }

    /// Create a coupon. `input.code` must already be normalized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(&self, input: &CouponInput) -> Result<Coupon, RepositoryError> {
        sqlx::query_as::<_, Coupon>(&format!(
            "INSERT INTO coupons
                 (code, description, discount_type, discount_value, min_order_amount,
                  max_discount_amount, usage_limit, is_active, starts_at, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, TRUE), $9, $10)
             RETURNING {COUPON_COLUMNS}"
        ))
        .bind(&input.code)
        .bind(input.description.as_deref())
        .bind(input.discount_type)
        .bind(input.discount_value)
        .bind(input.min_order_amount)
        .bind(input.max_discount_amount)
        .bind(input.usage_limit)
        .bind(input.is_active)
        .bind(input.starts_at)
        .bind(input.expires_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "coupon code"))
    }

    /// Apply a partial update. `update.code`, if set, must be normalized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist.
    /// Returns `RepositoryError::Conflict` if the new code is taken.
    pub async fn update(
        &self,
        id: CouponId,
        update: &CouponUpdate,
    ) -> Result<Coupon, RepositoryError> {
        sqlx::query_as::<_, Coupon>(&format!(
            "UPDATE coupons SET
                 code = COALESCE($2, code),
                 description = COALESCE($3, description),
                 discount_type = COALESCE($4, discount_type),
                 discount_value = COALESCE($5, discount_value),
                 min_order_amount = COALESCE($6, min_order_amount),
                 max_discount_amount = COALESCE($7, max_discount_amount),
                 usage_limit = COALESCE($8, usage_limit),
                 is_active = COALESCE($9, is_active),
                 starts_at = COALESCE($10, starts_at),
                 expires_at = COALESCE($11, expires_at),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {COUPON_COLUMNS}"
        ))
        .bind(id)
        .bind(update.code.as_deref())
        .bind(update.description.as_deref())
        .bind(update.discount_type)
        .bind(update.discount_value)
        .bind(update.min_order_amount)
        .bind(update.max_discount_amount)
        .bind(update.usage_limit)
        .bind(update.is_active)
        .bind(update.starts_at)
        .bind(update.expires_at)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "coupon code"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a coupon. Orders keep the code they were placed with.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist.
    pub async fn delete(&self, id: CouponId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Look up and lock a coupon by code inside a transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_by_code(
        conn: &mut PgConnection,
        code: &str,
    ) -> Result<Option<Coupon>, RepositoryError> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1 FOR UPDATE"
        ))
        .bind(code)
        .fetch_optional(conn)
        .await?;

        Ok(coupon)
    }

    /// Count one use of a coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_use(conn: &mut PgConnection, id: CouponId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE coupons SET used_count = used_count + 1, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }
}
