//! Wishlist service.

use sqlx::PgPool;

use shopfront_core::{ProductId, UserId};

use super::catalog::CatalogError;
use crate::db::{ProductRepository, RepositoryError, WishlistRepository};
use crate::models::WishlistEntry;

pub struct WishlistService<'a> {
    pool: &'a PgPool,
    wishlist: WishlistRepository<'a>,
}

impl<'a> WishlistService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            wishlist: WishlistRepository::new(pool),
        }
    }

    /// The user's saved products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<WishlistEntry>, CatalogError> {
        Ok(self.wishlist.list(user_id).await?)
    }

    /// Save a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown product and
    /// `CatalogError::Conflict` if it is already saved.
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<(), CatalogError> {
        ProductRepository::new(self.pool)
            .get_by_id(product_id)
            .await?
            .ok_or(CatalogError::NotFound("Product"))?;

        self.wishlist
            .add(user_id, product_id)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    CatalogError::Conflict("Product is already in the wishlist".to_string())
                }
                other => other.into(),
            })
    }

    /// Remove a saved product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product was not saved.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<(), CatalogError> {
        self.wishlist
            .remove(user_id, product_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CatalogError::NotFound("Wishlist item"),
                other => other.into(),
            })
    }
}
