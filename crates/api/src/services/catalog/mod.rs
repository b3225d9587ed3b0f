//! Catalog service: categories, products and their offer pricing.
//!
//! Public reads go through [`CatalogCache`]; every admin write clears it.

mod cache;

pub use cache::{CacheValue, CatalogCache};

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;

use shopfront_core::pricing::best_offer;
use shopfront_core::{CategoryId, ProductId};

use crate::db::{CategoryRepository, OfferRepository, ProductRepository, RepositoryError};
use crate::models::{
    Category, CategoryInput, CategoryNode, CategoryUpdate, Offer, Page, Product, ProductFilter,
    ProductInput, ProductUpdate, ProductView,
};

/// Errors from catalog, offer and wishlist operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The named resource does not exist (or is not visible).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Input failed validation.
    #[error("{0}")]
    Invalid(String),

    /// Uniqueness or referential conflict.
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CatalogError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(msg) => Self::Conflict(capitalize(&msg)),
            other => Self::Repository(other),
        }
    }
}

/// A category with its direct children.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<Category>,
}

/// Catalog service.
pub struct CatalogService<'a> {
    pool: &'a PgPool,
    cache: &'a CatalogCache,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CatalogCache) -> Self {
        Self { pool, cache }
    }

    // =========================================================================
    // Public reads
    // =========================================================================

    /// The active category tree.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn category_tree(&self) -> Result<Arc<Vec<CategoryNode>>, CatalogError> {
        if let Some(CacheValue::CategoryTree(tree)) = self.cache.get("categories").await {
            debug!("Cache hit for category tree");
            return Ok(tree);
        }

        let categories = CategoryRepository::new(self.pool).list_active().await?;
        let tree = Arc::new(CategoryNode::build_tree(categories));
        self.cache
            .insert("categories".to_string(), CacheValue::CategoryTree(tree.clone()))
            .await;
        Ok(tree)
    }

    /// An active category with its active children.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the category is unknown or inactive.
    pub async fn category(&self, id: CategoryId) -> Result<CategoryDetail, CatalogError> {
        let repo = CategoryRepository::new(self.pool);
        let category = repo
            .get_by_id(id)
            .await?
            .filter(|c| c.is_active)
            .ok_or(CatalogError::NotFound("Category"))?;
        let children = repo.children(id, true).await?;

        Ok(CategoryDetail { category, children })
    }

    /// Active products matching `filter`, priced with live offers.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if a query fails.
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Arc<Page<ProductView>>, CatalogError> {
        // Free-text searches are not cached
        let cache_key = filter
            .search_pattern()
            .is_none()
            .then(|| format!("products:{filter:?}"));

        if let Some(key) = &cache_key
            && let Some(CacheValue::Products(page)) = self.cache.get(key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let page = Arc::new(self.query_products(filter, false).await?);

        if let Some(key) = cache_key {
            self.cache.insert(key, CacheValue::Products(page.clone())).await;
        }
        Ok(page)
    }

    /// An active product by ID.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product is unknown or inactive.
    pub async fn product(&self, id: ProductId) -> Result<Arc<ProductView>, CatalogError> {
        let key = format!("product:{id}");
        if let Some(CacheValue::Product(view)) = self.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(view);
        }

        let product = ProductRepository::new(self.pool).get_by_id(id).await?;
        self.cache_product_view(key, product).await
    }

    /// An active product by slug.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product is unknown or inactive.
    pub async fn product_by_slug(&self, slug: &str) -> Result<Arc<ProductView>, CatalogError> {
        let key = format!("product-slug:{slug}");
        if let Some(CacheValue::Product(view)) = self.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(view);
        }

        let product = ProductRepository::new(self.pool).get_by_slug(slug).await?;
        self.cache_product_view(key, product).await
    }

    async fn cache_product_view(
        &self,
        key: String,
        product: Option<Product>,
    ) -> Result<Arc<ProductView>, CatalogError> {
        let product = product
            .filter(|p| p.is_active)
            .ok_or(CatalogError::NotFound("Product"))?;

        let view = self
            .price(vec![product])
            .await?
            .pop()
            .map(Arc::new)
            .ok_or(CatalogError::NotFound("Product"))?;

        self.cache.insert(key, CacheValue::Product(view.clone())).await;
        Ok(view)
    }

    /// Live offers that apply to an active product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product is unknown or inactive.
    pub async fn product_offers(&self, id: ProductId) -> Result<Vec<Offer>, CatalogError> {
        let product = ProductRepository::new(self.pool)
            .get_by_id(id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(CatalogError::NotFound("Product"))?;

        let categories: Vec<CategoryId> = product.category_id.into_iter().collect();
        let offers = OfferRepository::new(self.pool)
            .live_for(&[product.id], &categories)
            .await?;
        Ok(offers)
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// Products including inactive ones, priced with live offers.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if a query fails.
    pub async fn admin_list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Page<ProductView>, CatalogError> {
        self.query_products(filter, true).await
    }

    /// Every category, as a flat list.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn admin_list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(CategoryRepository::new(self.pool).list_all().await?)
    }

    /// Create a product. The slug is derived from the name when absent.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for bad input and
    /// `CatalogError::Conflict` for a duplicate slug or SKU.
    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, CatalogError> {
        require_name(&input.name)?;
        validate_amounts(Some(input.price), input.compare_at_price, input.stock_quantity)?;
        self.require_category(input.category_id).await?;
        let slug = slug_or_name(input.slug.as_deref(), &input.name)?;

        let product = ProductRepository::new(self.pool).create(input, &slug).await?;
        self.cache.invalidate_all().await;
        Ok(product)
    }

    /// Apply a partial product update.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound`, `CatalogError::Invalid` or
    /// `CatalogError::Conflict`.
    pub async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, CatalogError> {
        if let Some(name) = &update.name {
            require_name(name)?;
        }
        validate_amounts(update.price, update.compare_at_price, update.stock_quantity)?;
        self.require_category(update.category_id).await?;

        let mut update = update.clone();
        if let Some(slug) = update.slug.as_deref() {
            update.slug = Some(checked_slug(slug)?);
        }

        let product = ProductRepository::new(self.pool)
            .update(id, &update)
            .await
            .map_err(not_found("Product"))?;
        self.cache.invalidate_all().await;
        Ok(product)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist.
    pub async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        ProductRepository::new(self.pool)
            .delete(id)
            .await
            .map_err(not_found("Product"))?;
        self.cache.invalidate_all().await;
        Ok(())
    }

    /// Append an uploaded image URL to a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist.
    pub async fn add_product_image(&self, id: ProductId, url: &str) -> Result<Product, CatalogError> {
        let product = ProductRepository::new(self.pool)
            .append_image(id, url)
            .await
            .map_err(not_found("Product"))?;
        self.cache.invalidate_all().await;
        Ok(product)
    }

    /// Whether a product exists (active or not).
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn product_exists(&self, id: ProductId) -> Result<bool, CatalogError> {
        Ok(ProductRepository::new(self.pool).get_by_id(id).await?.is_some())
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for bad input and
    /// `CatalogError::Conflict` for a duplicate slug.
    pub async fn create_category(&self, input: &CategoryInput) -> Result<Category, CatalogError> {
        require_name(&input.name)?;
        if let Some(parent) = input.parent_id {
            CategoryRepository::new(self.pool)
                .get_by_id(parent)
                .await?
                .ok_or_else(|| CatalogError::Invalid("Parent category not found".to_string()))?;
        }
        let slug = slug_or_name(input.slug.as_deref(), &input.name)?;

        let category = CategoryRepository::new(self.pool).create(input, &slug).await?;
        self.cache.invalidate_all().await;
        Ok(category)
    }

    /// Apply a partial category update.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` if the category would become its own
    /// ancestor.
    pub async fn update_category(
        &self,
        id: CategoryId,
        update: &CategoryUpdate,
    ) -> Result<Category, CatalogError> {
        if let Some(name) = &update.name {
            require_name(name)?;
        }

        let repo = CategoryRepository::new(self.pool);
        if let Some(parent) = update.parent_id {
            if parent == id {
                return Err(CatalogError::Invalid(
                    "A category cannot be its own parent".to_string(),
                ));
            }
            repo.get_by_id(parent)
                .await?
                .ok_or_else(|| CatalogError::Invalid("Parent category not found".to_string()))?;
            if repo.subtree_ids(id).await?.contains(&parent) {
                return Err(CatalogError::Invalid(
                    "A category cannot be moved under its own descendant".to_string(),
                ));
            }
        }

        let mut update = update.clone();
        if let Some(slug) = update.slug.as_deref() {
            update.slug = Some(checked_slug(slug)?);
        }

        let category = repo
            .update(id, &update)
            .await
            .map_err(not_found("Category"))?;
        self.cache.invalidate_all().await;
        Ok(category)
    }

    /// Delete a category that has no children and no products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Conflict` if the category is still in use.
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), CatalogError> {
        let repo = CategoryRepository::new(self.pool);
        repo.get_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound("Category"))?;

        if repo.is_in_use(id).await? {
            return Err(CatalogError::Conflict(
                "Category has subcategories or products".to_string(),
            ));
        }

        repo.delete(id).await.map_err(not_found("Category"))?;
        self.cache.invalidate_all().await;
        Ok(())
    }

    /// Clear cached catalog reads, e.g. after an offer changes.
    pub async fn invalidate(&self) {
        self.cache.invalidate_all().await;
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn query_products(
        &self,
        filter: &ProductFilter,
        include_inactive: bool,
    ) -> Result<Page<ProductView>, CatalogError> {
        let category_ids = match filter.category_id {
            Some(root) => Some(CategoryRepository::new(self.pool).subtree_ids(root).await?),
            None => None,
        };

        let (products, total) = ProductRepository::new(self.pool)
            .list(filter, category_ids.as_deref(), include_inactive)
            .await?;

        let views = self.price(products).await?;
        Ok(Page::new(views, total, filter.page_params()))
    }

    /// Attach effective prices from live offers.
    async fn price(&self, products: Vec<Product>) -> Result<Vec<ProductView>, CatalogError> {
        if products.is_empty() {
            return Ok(Vec::new());
        }

        let product_ids: Vec<ProductId> = products.iter().map(|p| p.id).collect();
        let category_ids: Vec<CategoryId> = products
            .iter()
            .filter_map(|p| p.category_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let offers = OfferRepository::new(self.pool)
            .live_for(&product_ids, &category_ids)
            .await?;

        Ok(apply_offers(products, &offers, Utc::now()))
    }

    async fn require_category(&self, id: Option<CategoryId>) -> Result<(), CatalogError> {
        if let Some(id) = id {
            CategoryRepository::new(self.pool)
                .get_by_id(id)
                .await?
                .ok_or_else(|| CatalogError::Invalid("Category not found".to_string()))?;
        }
        Ok(())
    }
}

/// Price products with the best applicable offer.
#[must_use]
pub fn apply_offers(products: Vec<Product>, offers: &[Offer], now: DateTime<Utc>) -> Vec<ProductView> {
    products
        .into_iter()
        .map(|product| {
            let applicable: Vec<&Offer> = offers
                .iter()
                .filter(|o| o.applies_to(product.id, product.category_id))
                .collect();
            let terms: Vec<_> = applicable.iter().map(|o| o.terms()).collect();

            let (effective_price, offer_id) = match best_offer(product.price, &terms, now) {
                Some((idx, price)) => (price, applicable.get(idx).map(|o| o.id)),
                None => (product.price, None),
            };

            ProductView {
                in_stock: product.stock_quantity > 0,
                effective_price,
                offer_id,
                product,
            }
        })
        .collect()
}

/// Turn a name into a URL slug: lowercase ASCII letters and digits joined by
/// single hyphens.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

fn slug_or_name(slug: Option<&str>, name: &str) -> Result<String, CatalogError> {
    match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => checked_slug(slug),
        None => checked_slug(name),
    }
}

fn checked_slug(raw: &str) -> Result<String, CatalogError> {
    let slug = slugify(raw);
    if slug.is_empty() {
        return Err(CatalogError::Invalid(
            "Slug must contain letters or digits".to_string(),
        ));
    }
    Ok(slug)
}

fn require_name(name: &str) -> Result<(), CatalogError> {
    if name.trim().is_empty() {
        return Err(CatalogError::Invalid("Name is required".to_string()));
    }
    Ok(())
}

fn validate_amounts(
    price: Option<Decimal>,
    compare_at_price: Option<Decimal>,
    stock_quantity: Option<i32>,
) -> Result<(), CatalogError> {
    if price.is_some_and(|p| p.is_sign_negative()) {
        return Err(CatalogError::Invalid("Price cannot be negative".to_string()));
    }
    if compare_at_price.is_some_and(|p| p.is_sign_negative()) {
        return Err(CatalogError::Invalid(
            "Compare-at price cannot be negative".to_string(),
        ));
    }
    if stock_quantity.is_some_and(|s| s < 0) {
        return Err(CatalogError::Invalid(
            "Stock quantity cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn not_found(what: &'static str) -> impl Fn(RepositoryError) -> CatalogError {
    move |e| match e {
        RepositoryError::NotFound => CatalogError::NotFound(what),
        other => other.into(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use sqlx::types::Json;

    use shopfront_core::{DiscountType, OfferId};

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn product(id: i32, price: &str, category: Option<i32>) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            slug: format!("product-{id}"),
            description: None,
            price: dec(price),
            compare_at_price: None,
            sku: None,
            stock_quantity: 3,
            category_id: category.map(CategoryId::new),
            images: Json(Vec::new()),
            is_active: true,
            is_featured: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn offer(id: i32, value: &str, product: Option<i32>, category: Option<i32>) -> Offer {
        Offer {
            id: OfferId::new(id),
            title: format!("Offer {id}"),
            description: None,
            discount_type: DiscountType::Percentage,
            discount_value: dec(value),
            product_id: product.map(ProductId::new),
            category_id: category.map(CategoryId::new),
            starts_at: None,
            ends_at: None,
            usage_limit: None,
            used_count: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Blue Ceramic Mug"), "blue-ceramic-mug");
        assert_eq!(slugify("  --Tea & Coffee!! "), "tea-coffee");
        assert_eq!(slugify("Café 2000"), "caf-2000");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slug_or_name() {
        assert_eq!(slug_or_name(None, "Hello World").unwrap(), "hello-world");
        assert_eq!(slug_or_name(Some("  "), "Hello").unwrap(), "hello");
        assert_eq!(slug_or_name(Some("Custom Slug"), "Hello").unwrap(), "custom-slug");
        assert!(matches!(
            slug_or_name(None, "???"),
            Err(CatalogError::Invalid(_))
        ));
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_amounts(Some(dec("0")), None, Some(0)).is_ok());
        assert!(validate_amounts(Some(dec("-0.01")), None, None).is_err());
        assert!(validate_amounts(None, Some(dec("-1")), None).is_err());
        assert!(validate_amounts(None, None, Some(-1)).is_err());
    }

    #[test]
    fn test_apply_offers_uses_product_and_category_offers() {
        let products = vec![
            product(1, "100.00", Some(10)),
            product(2, "50.00", Some(20)),
            product(3, "20.00", None),
        ];
        let offers = vec![
            offer(1, "10", Some(1), None),
            offer(2, "25", None, Some(10)),
            offer(3, "50", Some(99), None),
        ];

        let views = apply_offers(products, &offers, Utc::now());

        assert_eq!(views[0].effective_price, dec("75.00"));
        assert_eq!(views[0].offer_id, Some(OfferId::new(2)));
        assert_eq!(views[1].effective_price, dec("50.00"));
        assert_eq!(views[1].offer_id, None);
        assert_eq!(views[2].effective_price, dec("20.00"));
        assert!(views[2].in_stock);
    }

    #[test]
    fn test_repository_conflict_message_is_capitalized() {
        let err: CatalogError =
            RepositoryError::Conflict("product slug or sku already exists".to_string()).into();
        assert_eq!(err.to_string(), "Product slug or sku already exists");
    }
}
