//! Wishlist repository.

use sqlx::PgPool;

use shopfront_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::WishlistEntry;

/// Repository for wishlist database operations.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's saved products, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<WishlistEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, WishlistEntry>(
            "SELECT w.id, w.product_id, p.name, p.slug, p.price, p.images,
                    p.stock_quantity, p.is_active, w.created_at
             FROM wishlist w
             JOIN products p ON p.id = w.product_id
             WHERE w.user_id = $1
             ORDER BY w.created_at DESC, w.id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }

    /// Save a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product is already saved.
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO wishlist (user_id, product_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, "wishlist item"))?;
        Ok(())
    }

    /// Remove a saved product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product was not saved.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM wishlist WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
