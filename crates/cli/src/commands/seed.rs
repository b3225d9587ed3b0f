//! Seed the catalog from a YAML file.
//!
//! Categories are matched by slug and products by slug, so running the
//! command twice leaves existing rows untouched. Coupons are matched by
//! code.
//!
//! ```yaml
//! categories:
//!   - name: Apparel
//!     children:
//!       - name: T-Shirts
//! products:
//!   - name: Logo Tee
//!     category: t-shirts
//!     price: "24.00"
//!     stock_quantity: 40
//! coupons:
//!   - code: WELCOME10
//!     discount_type: percentage
//!     discount_value: "10"
//! ```

use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use shopfront_api::db::{CategoryRepository, CouponRepository, ProductRepository};
use shopfront_api::models::{CategoryInput, CouponInput, ProductInput};
use shopfront_api::services::catalog::slugify;
use shopfront_api::services::{CatalogCache, CatalogService, CouponService};
use shopfront_core::CategoryId;

use super::connect;

/// Top-level seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
    #[serde(default)]
    pub coupons: Vec<CouponInput>,
}

/// A category and its subcategories.
#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub children: Vec<Self>,
}

/// A product, referencing its category by slug.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub sku: Option<String>,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Counts reported after seeding.
#[derive(Debug, Default)]
struct SeedSummary {
    inserted: usize,
    skipped: usize,
}

/// Load the seed file and insert whatever is missing.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or a database
/// operation fails.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading seed file");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let pool = connect().await?;
    let cache = CatalogCache::new();
    let catalog = CatalogService::new(&pool, &cache);

    // Slug -> id for everything already in the database
    let mut categories: HashMap<String, CategoryId> = CategoryRepository::new(&pool)
        .list_all()
        .await?
        .into_iter()
        .map(|c| (c.slug, c.id))
        .collect();

    let mut summary = SeedSummary::default();

    // Parents are created before their children
    let mut pending: Vec<(&SeedCategory, Option<CategoryId>)> =
        seed.categories.iter().map(|c| (c, None)).collect();
    while let Some((category, parent_id)) = pending.pop() {
        let slug = category
            .slug
            .clone()
            .unwrap_or_else(|| slugify(&category.name));

        let id = if let Some(id) = categories.get(&slug) {
            summary.skipped += 1;
            *id
        } else {
            let created = catalog
                .create_category(&CategoryInput {
                    name: category.name.clone(),
                    slug: Some(slug.clone()),
                    description: category.description.clone(),
                    parent_id,
                    image_url: None,
                    is_active: Some(true),
                    sort_order: Some(category.sort_order),
                })
                .await?;
            summary.inserted += 1;
            categories.insert(slug, created.id);
            created.id
        };

        pending.extend(category.children.iter().map(|child| (child, Some(id))));
    }
    info!(inserted = summary.inserted, skipped = summary.skipped, "Categories seeded");

    let products = ProductRepository::new(&pool);
    let mut summary = SeedSummary::default();
    for product in &seed.products {
        let slug = product.slug.clone().unwrap_or_else(|| slugify(&product.name));
        if products.get_by_slug(&slug).await?.is_some() {
            summary.skipped += 1;
            continue;
        }

        let category_id = match product.category.as_deref() {
            Some(category) => {
                let id = categories.get(category).copied();
                if id.is_none() {
                    warn!(product = %product.name, %category, "Unknown category, seeding without one");
                }
                id
            }
            None => None,
        };

        catalog
            .create_product(&ProductInput {
                name: product.name.clone(),
                slug: Some(slug),
                description: product.description.clone(),
                price: product.price,
                compare_at_price: product.compare_at_price,
                sku: product.sku.clone(),
                stock_quantity: Some(product.stock_quantity),
                category_id,
                images: Some(product.images.clone()),
                is_active: Some(true),
                is_featured: Some(product.featured),
            })
            .await?;
        summary.inserted += 1;
    }
    info!(inserted = summary.inserted, skipped = summary.skipped, "Products seeded");

    let coupons = CouponRepository::new(&pool);
    let coupon_service = CouponService::new(&pool);
    let mut summary = SeedSummary::default();
    for coupon in &seed.coupons {
        if coupons.get_by_code(&coupon.code).await?.is_some() {
            summary.skipped += 1;
            continue;
        }
        coupon_service.create(coupon).await?;
        summary.inserted += 1;
    }
    info!(inserted = summary.inserted, skipped = summary.skipped, "Coupons seeded");

    info!("Seeding complete!");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed_file() {
        let seed: SeedFile = serde_yaml::from_str(
            r#"
categories:
  - name: Apparel
    children:
      - name: T-Shirts
        slug: tees
products:
  - name: Logo Tee
    category: tees
    price: "24.00"
    stock_quantity: 40
    featured: true
coupons:
  - code: WELCOME10
    discount_type: percentage
    discount_value: "10"
"#,
        )
        .unwrap();

        assert_eq!(seed.categories.len(), 1);
        let apparel = seed.categories.first().unwrap();
        assert_eq!(apparel.children.first().unwrap().slug.as_deref(), Some("tees"));

        let tee = seed.products.first().unwrap();
        assert_eq!(tee.price, Decimal::new(2400, 2));
        assert!(tee.featured);
        assert_eq!(seed.coupons.first().unwrap().code, "WELCOME10");
    }

    #[test]
    fn test_bundled_seed_file_parses() {
        let content = include_str!("../../seed/catalog.yaml");
        let seed: SeedFile = serde_yaml::from_str(content).unwrap();
        assert!(!seed.categories.is_empty());
        assert!(!seed.products.is_empty());
    }
}
