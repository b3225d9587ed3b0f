//! Category repository.

use sqlx::PgPool;

use shopfront_core::CategoryId;

use super::RepositoryError;
use crate::models::{Category, CategoryInput, CategoryUpdate};

const CATEGORY_COLUMNS: &str = "id, name, slug, description, parent_id, image_url, is_active, \
     sort_order, created_at, updated_at";

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All active categories ordered for display.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories
             WHERE is_active
             ORDER BY sort_order, name"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// Every category, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY sort_order, name"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(category)
    }

    /// Direct children of a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn children(
        &self,
        id: CategoryId,
        active_only: bool,
    ) -> Result<Vec<Category>, RepositoryError> {
        let children = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories
             WHERE parent_id = $1 AND (is_active OR NOT $2)
             ORDER BY sort_order, name"
        ))
        .bind(id)
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;

        Ok(children)
    }

    /// IDs of a category and all of its descendants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn subtree_ids(&self, root: CategoryId) -> Result<Vec<CategoryId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, CategoryId>(
            "WITH RECURSIVE tree AS (
                 SELECT id FROM categories WHERE id = $1
                 UNION
                 SELECT c.id FROM categories c JOIN tree t ON c.parent_id = t.id
             )
             SELECT id FROM tree",
        )
        .bind(root)
        .fetch_all(self.pool)
        .await?;

        Ok(ids)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(
        &self,
        input: &CategoryInput,
        slug: &str,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO categories (name, slug, description, parent_id, image_url, is_active, sort_order)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, TRUE), COALESCE($7, 0))
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(input.name.trim())
        .bind(slug)
        .bind(input.description.as_deref())
        .bind(input.parent_id)
        .bind(input.image_url.as_deref())
        .bind(input.is_active)
        .bind(input.sort_order)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "category slug"))
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        update: &CategoryUpdate,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(&format!(
            "UPDATE categories SET
                 name = COALESCE($2, name),
                 slug = COALESCE($3, slug),
                 description = COALESCE($4, description),
                 parent_id = COALESCE($5, parent_id),
                 image_url = COALESCE($6, image_url),
                 is_active = COALESCE($7, is_active),
                 sort_order = COALESCE($8, sort_order),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.slug.as_deref())
        .bind(update.description.as_deref())
        .bind(update.parent_id)
        .bind(update.image_url.as_deref())
        .bind(update.is_active)
        .bind(update.sort_order)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "category slug"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Whether the category has child categories or products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_in_use(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let in_use = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM categories WHERE parent_id = $1)
                 OR EXISTS (SELECT 1 FROM products WHERE category_id = $1)",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(in_use)
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if it is still referenced.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, "category"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
