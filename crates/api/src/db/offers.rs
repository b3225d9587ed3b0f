//! Offer repository.

use sqlx::{PgConnection, PgPool};

use shopfront_core::{CategoryId, OfferId, ProductId};

use super::RepositoryError;
use crate::models::{Offer, OfferInput, OfferUpdate};

const OFFER_COLUMNS: &str = "id, title, description, discount_type, discount_value, product_id, \
     category_id, starts_at, ends_at, usage_limit, used_count, is_active, created_at, updated_at";

/// Offers that apply right now.
const LIVE_FILTER: &str = "is_active
     AND (starts_at IS NULL OR starts_at <= NOW())
     AND (ends_at IS NULL OR ends_at > NOW())
     AND (usage_limit IS NULL OR used_count < usage_limit)";

/// Repository for offer database operations.
pub struct OfferRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OfferRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every live offer, ending soonest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_live(&self) -> Result<Vec<Offer>, RepositoryError> {
        let offers = sqlx::query_as::<_, Offer>(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers
             WHERE {LIVE_FILTER}
             ORDER BY ends_at NULLS LAST, id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(offers)
    }

    /// Live offers on any of the given products or categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn live_for(
        &self,
        product_ids: &[ProductId],
        category_ids: &[CategoryId],
    ) -> Result<Vec<Offer>, RepositoryError> {
        let product_ids: Vec<i32> = product_ids.iter().map(ProductId::as_i32).collect();
        let category_ids: Vec<i32> = category_ids.iter().map(CategoryId::as_i32).collect();

        let offers = sqlx::query_as::<_, Offer>(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers
             WHERE {LIVE_FILTER}
               AND (product_id = ANY($1) OR category_id = ANY($2))
             ORDER BY id"
        ))
        .bind(&product_ids)
        .bind(&category_ids)
        .fetch_all(self.pool)
        .await?;

        Ok(offers)
    }

    /// Every offer, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Offer>, RepositoryError> {
        let offers = sqlx::query_as::<_, Offer>(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(offers)
    }

    /// Get an offer by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OfferId) -> Result<Option<Offer>, RepositoryError> {
        let offer = sqlx::query_as::<_, Offer>(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(offer)
    }

    /// Create an offer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the target product or category
    /// does not exist.
    pub async fn create(&self, input: &OfferInput) -> Result<Offer, RepositoryError> {
        sqlx::query_as::<_, Offer>(&format!(
            "INSERT INTO offers
                 (title, description, discount_type, discount_value, product_id, category_id,
                  starts_at, ends_at, usage_limit, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, TRUE))
             RETURNING {OFFER_COLUMNS}"
        ))
        .bind(input.title.trim())
        .bind(input.description.as_deref())
        .bind(input.discount_type)
        .bind(input.discount_value)
        .bind(input.product_id)
        .bind(input.category_id)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .bind(input.usage_limit)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "offer target"))
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the offer does not exist.
    pub async fn update(&self, id: OfferId, update: &OfferUpdate) -> Result<Offer, RepositoryError> {
        sqlx::query_as::<_, Offer>(&format!(
            "UPDATE offers SET
                 title = COALESCE($2, title),
                 description = COALESCE($3, description),
                 discount_type = COALESCE($4, discount_type),
                 discount_value = COALESCE($5, discount_value),
                 product_id = COALESCE($6, product_id),
                 category_id = COALESCE($7, category_id),
                 starts_at = COALESCE($8, starts_at),
                 ends_at = COALESCE($9, ends_at),
                 usage_limit = COALESCE($10, usage_limit),
                 is_active = COALESCE($11, is_active),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {OFFER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.title.as_deref().map(str::trim))
        .bind(update.description.as_deref())
        .bind(update.discount_type)
        .bind(update.discount_value)
        .bind(update.product_id)
        .bind(update.category_id)
        .bind(update.starts_at)
        .bind(update.ends_at)
        .bind(update.usage_limit)
        .bind(update.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "offer target"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete an offer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the offer does not exist.
    pub async fn delete(&self, id: OfferId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM offers WHERE id = $1")
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

    /// Lock live offers on the given products or categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_live_for(
        conn: &mut PgConnection,
        product_ids: &[ProductId],
        category_ids: &[CategoryId],
    ) -> Result<Vec<Offer>, RepositoryError> {
        let product_ids: Vec<i32> = product_ids.iter().map(ProductId::as_i32).collect();
        let category_ids: Vec<i32> = category_ids.iter().map(CategoryId::as_i32).collect();

        let offers = sqlx::query_as::<_, Offer>(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers
             WHERE {LIVE_FILTER}
               AND (product_id = ANY($1) OR category_id = ANY($2))
             ORDER BY id
             FOR UPDATE"
        ))
        .bind(&product_ids)
        .bind(&category_ids)
        .fetch_all(conn)
        .await?;

        Ok(offers)
    }

    /// Count one use of each offer in `ids`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_uses(conn: &mut PgConnection, ids: &[OfferId]) -> Result<(), RepositoryError> {
        if ids.is_empty() {
            return Ok(());
        }
        let ids: Vec<i32> = ids.iter().map(OfferId::as_i32).collect();
        sqlx::query(
            "UPDATE offers SET used_count = used_count + 1, updated_at = NOW() WHERE id = ANY($1)",
        )
        .bind(&ids)
        .execute(conn)
        .await?;
        Ok(())
    }
}
