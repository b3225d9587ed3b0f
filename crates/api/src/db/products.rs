//! Product repository.

use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use shopfront_core::{CategoryId, ProductId};

use super::{RepositoryError, page_offset};
use crate::models::{Product, ProductFilter, ProductInput, ProductUpdate};

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.slug, p.description, p.price, p.compare_at_price, \
     p.sku, p.stock_quantity, p.category_id, p.images, p.is_active, p.is_featured, \
     p.created_at, p.updated_at";

/// `$1..$7` filter shared by the count and page queries.
const LIST_FILTER: &str = "(p.is_active OR $1)
     AND ($2::INT[] IS NULL OR p.category_id = ANY($2))
     AND ($3::TEXT IS NULL OR p.name ILIKE $3 OR p.description ILIKE $3 OR p.sku ILIKE $3)
     AND ($4::NUMERIC IS NULL OR p.price >= $4)
     AND ($5::NUMERIC IS NULL OR p.price <= $5)
     AND ($6::BOOL IS NULL OR p.is_featured = $6)
     AND ($7::BOOL IS NOT TRUE OR p.stock_quantity > 0)";

/// Stock level of a product locked inside a transaction.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LockedProduct {
    pub id: ProductId,
    pub name: String,
    pub price: rust_decimal::Decimal,
    pub category_id: Option<CategoryId>,
    pub stock_quantity: i32,
    pub is_active: bool,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching `filter`.
    ///
    /// `category_ids` restricts results to these categories (the filter's
    /// category plus its descendants). Inactive products are only included
    /// when `include_inactive` is set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        category_ids: Option<&[CategoryId]>,
        include_inactive: bool,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let category_ids: Option<Vec<i32>> =
            category_ids.map(|ids| ids.iter().map(CategoryId::as_i32).collect());
        let search = filter.search_pattern();
        let params = filter.page_params();

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM products p WHERE {LIST_FILTER}"
        ))
        .bind(include_inactive)
        .bind(category_ids.as_deref())
        .bind(search.as_deref())
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.featured)
        .bind(filter.in_stock)
        .fetch_one(self.pool)
        .await?;

        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p
             WHERE {LIST_FILTER}
             ORDER BY {}
             LIMIT $8 OFFSET $9",
            filter.sort.order_by()
        ))
        .bind(include_inactive)
        .bind(category_ids.as_deref())
        .bind(search.as_deref())
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.featured)
        .bind(filter.in_stock)
        .bind(i64::from(params.per_page()))
        .bind(page_offset(params.page(), params.per_page()))
        .fetch_all(self.pool)
        .await?;

        Ok((products, total))
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Get a product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug or SKU is taken.
    pub async fn create(&self, input: &ProductInput, slug: &str) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products AS p
                 (name, slug, description, price, compare_at_price, sku, stock_quantity,
                  category_id, images, is_active, is_featured)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 0), $8, $9,
                     COALESCE($10, TRUE), COALESCE($11, FALSE))
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(input.name.trim())
        .bind(slug)
        .bind(input.description.as_deref())
        .bind(input.price)
        .bind(input.compare_at_price)
        .bind(input.sku.as_deref())
        .bind(input.stock_quantity)
        .bind(input.category_id)
        .bind(Json(input.images.clone().unwrap_or_default()))
        .bind(input.is_active)
        .bind(input.is_featured)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "product slug or sku"))
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if the new slug or SKU is taken.
    pub async fn update(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products AS p SET
                 name = COALESCE($2, p.name),
                 slug = COALESCE($3, p.slug),
                 description = COALESCE($4, p.description),
                 price = COALESCE($5, p.price),
                 compare_at_price = COALESCE($6, p.compare_at_price),
                 sku = COALESCE($7, p.sku),
                 stock_quantity = COALESCE($8, p.stock_quantity),
                 category_id = COALESCE($9, p.category_id),
                 images = COALESCE($10, p.images),
                 is_active = COALESCE($11, p.is_active),
                 is_featured = COALESCE($12, p.is_featured),
                 updated_at = NOW()
             WHERE p.id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.slug.as_deref())
        .bind(update.description.as_deref())
        .bind(update.price)
        .bind(update.compare_at_price)
        .bind(update.sku.as_deref())
        .bind(update.stock_quantity)
        .bind(update.category_id)
        .bind(update.images.clone().map(Json))
        .bind(update.is_active)
        .bind(update.is_featured)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "product slug or sku"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Append an image URL to a product's image list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn append_image(&self, id: ProductId, url: &str) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products AS p
             SET images = p.images || jsonb_build_array($2::TEXT), updated_at = NOW()
             WHERE p.id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(url)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product. Cart, wishlist and offer rows go with it; order
    /// lines keep their snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Transactional stock operations
    // =========================================================================

    /// Lock product rows for the rest of the transaction, in ID order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_many(
        conn: &mut PgConnection,
        ids: &[ProductId],
    ) -> Result<Vec<LockedProduct>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let products = sqlx::query_as::<_, LockedProduct>(
            "SELECT id, name, price, category_id, stock_quantity, is_active
             FROM products
             WHERE id = ANY($1)
             ORDER BY id
             FOR UPDATE",
        )
        .bind(&ids)
        .fetch_all(conn)
        .await?;

        Ok(products)
    }

    /// Lock a single product row for the rest of the transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_one(
        conn: &mut PgConnection,
        id: ProductId,
    ) -> Result<Option<LockedProduct>, RepositoryError> {
        Ok(Self::lock_many(conn, &[id]).await?.into_iter().next())
    }

    /// Change a product's stock by `delta`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if stock would go negative.
    pub async fn adjust_stock(
        conn: &mut PgConnection,
        id: ProductId,
        delta: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(delta)
        .execute(conn)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_check_violation()
            {
                return RepositoryError::Conflict("insufficient stock".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }
}
