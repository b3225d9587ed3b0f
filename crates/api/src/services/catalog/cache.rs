//! Read-through cache for public catalog reads.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::models::{CategoryNode, Page, ProductView};

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    CategoryTree(Arc<Vec<CategoryNode>>),
    Product(Arc<ProductView>),
    Products(Arc<Page<ProductView>>),
}

/// Catalog cache with a 5-minute TTL.
///
/// Keys are strings such as `product:12`, `product-slug:blue-mug` or
/// `products:<filter>`. Admin writes, checkouts and cancellations clear the
/// whole cache.
#[derive(Clone)]
pub struct CatalogCache {
    inner: Cache<String, CacheValue>,
}

impl CatalogCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(300))
    }

    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(1000)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<CacheValue> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: String, value: CacheValue) {
        self.inner.insert(key, value).await;
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalidate_all_clears_entries() {
        let cache = CatalogCache::new();
        cache
            .insert(
                "categories".to_string(),
                CacheValue::CategoryTree(Arc::new(Vec::new())),
            )
            .await;
        assert!(cache.get("categories").await.is_some());

        cache.invalidate_all().await;
        assert!(cache.get("categories").await.is_none());
    }
}
