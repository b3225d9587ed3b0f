//! Offer service: live promotions and their admin management.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use shopfront_core::{CategoryId, DiscountType, OfferId, ProductId};

use super::catalog::{CatalogCache, CatalogError};
use crate::db::{CategoryRepository, OfferRepository, ProductRepository, RepositoryError};
use crate::models::{Offer, OfferInput, OfferUpdate};

/// Offer service. Writes clear the catalog cache since they change prices.
pub struct OfferService<'a> {
    pool: &'a PgPool,
    cache: &'a CatalogCache,
    offers: OfferRepository<'a>,
}

impl<'a> OfferService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CatalogCache) -> Self {
        Self {
            pool,
            cache,
            offers: OfferRepository::new(pool),
        }
    }

    /// Offers that apply right now.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn live(&self) -> Result<Vec<Offer>, CatalogError> {
        Ok(self.offers.list_live().await?)
    }

    /// Every offer, including expired and inactive ones.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Offer>, CatalogError> {
        Ok(self.offers.list_all().await?)
    }

    /// An offer by ID.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the offer does not exist.
    pub async fn get(&self, id: OfferId) -> Result<Offer, CatalogError> {
        self.offers
            .get_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound("Offer"))
    }

    /// Create an offer.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for bad input.
    pub async fn create(&self, input: &OfferInput) -> Result<Offer, CatalogError> {
        if input.title.trim().is_empty() {
            return Err(CatalogError::Invalid("Title is required".to_string()));
        }
        validate_terms(&Terms {
            discount_type: input.discount_type,
            discount_value: input.discount_value,
            product_id: input.product_id,
            category_id: input.category_id,
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            usage_limit: input.usage_limit,
        })?;
        self.require_target(input.product_id, input.category_id).await?;

        let offer = self.offers.create(input).await?;
        self.cache.invalidate_all().await;
        Ok(offer)
    }

    /// Apply a partial update, validating the offer as it would be after it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` or `CatalogError::Invalid`.
    pub async fn update(&self, id: OfferId, update: &OfferUpdate) -> Result<Offer, CatalogError> {
        let current = self.get(id).await?;

        if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(CatalogError::Invalid("Title is required".to_string()));
        }
        validate_terms(&Terms {
            discount_type: update.discount_type.unwrap_or(current.discount_type),
            discount_value: update.discount_value.unwrap_or(current.discount_value),
            product_id: update.product_id.or(current.product_id),
            category_id: update.category_id.or(current.category_id),
            starts_at: update.starts_at.or(current.starts_at),
            ends_at: update.ends_at.or(current.ends_at),
            usage_limit: update.usage_limit.or(current.usage_limit),
        })?;
        self.require_target(update.product_id, update.category_id).await?;

        let offer = self.offers.update(id, update).await.map_err(|e| match e {
            RepositoryError::NotFound => CatalogError::NotFound("Offer"),
            other => other.into(),
        })?;
        self.cache.invalidate_all().await;
        Ok(offer)
    }

    /// Delete an offer.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the offer does not exist.
    pub async fn delete(&self, id: OfferId) -> Result<(), CatalogError> {
        self.offers.delete(id).await.map_err(|e| match e {
            RepositoryError::NotFound => CatalogError::NotFound("Offer"),
            other => other.into(),
        })?;
        self.cache.invalidate_all().await;
        Ok(())
    }

    async fn require_target(
        &self,
        product_id: Option<ProductId>,
        category_id: Option<CategoryId>,
    ) -> Result<(), CatalogError> {
        if let Some(id) = product_id
            && ProductRepository::new(self.pool).get_by_id(id).await?.is_none()
        {
            return Err(CatalogError::Invalid("Product not found".to_string()));
        }
        if let Some(id) = category_id
            && CategoryRepository::new(self.pool).get_by_id(id).await?.is_none()
        {
            return Err(CatalogError::Invalid("Category not found".to_string()));
        }
        Ok(())
    }
}

/// Offer fields that must be consistent with each other.
struct Terms {
    discount_type: DiscountType,
    discount_value: Decimal,
    product_id: Option<ProductId>,
    category_id: Option<CategoryId>,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    usage_limit: Option<i32>,
}

fn validate_terms(terms: &Terms) -> Result<(), CatalogError> {
    let invalid = |msg: &str| Err(CatalogError::Invalid(msg.to_string()));

    if terms.product_id.is_none() && terms.category_id.is_none() {
        return invalid("An offer must target a product or a category");
    }
    match terms.discount_type {
        DiscountType::Percentage
            if terms.discount_value <= Decimal::ZERO || terms.discount_value > Decimal::ONE_HUNDRED =>
        {
            return invalid("Percentage discount must be greater than 0 and at most 100");
        }
        DiscountType::Fixed if terms.discount_value <= Decimal::ZERO => {
            return invalid("Fixed discount must be greater than 0");
        }
        _ => {}
    }
    if terms.usage_limit.is_some_and(|l| l < 1) {
        return invalid("Usage limit must be at least 1");
    }
    if let (Some(starts), Some(ends)) = (terms.starts_at, terms.ends_at)
        && ends <= starts
    {
        return invalid("End date must be after the start date");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn terms() -> Terms {
        Terms {
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(20),
            product_id: Some(ProductId::new(1)),
            category_id: None,
            starts_at: None,
            ends_at: None,
            usage_limit: None,
        }
    }

    #[test]
    fn test_offer_needs_a_target() {
        assert!(validate_terms(&terms()).is_ok());

        let untargeted = Terms {
            product_id: None,
            ..terms()
        };
        assert!(matches!(
            validate_terms(&untargeted),
            Err(CatalogError::Invalid(msg)) if msg.contains("target")
        ));
    }

    #[test]
    fn test_offer_window_must_be_ordered() {
        let now = Utc::now();
        let backwards = Terms {
            starts_at: Some(now),
            ends_at: Some(now),
            ..terms()
        };
        assert!(validate_terms(&backwards).is_err());

        let forwards = Terms {
            starts_at: Some(now),
            ends_at: Some(now + Duration::hours(1)),
            ..terms()
        };
        assert!(validate_terms(&forwards).is_ok());
    }

    #[test]
    fn test_offer_values() {
        let too_much = Terms {
            discount_value: Decimal::from(150),
            ..terms()
        };
        assert!(validate_terms(&too_much).is_err());

        let free = Terms {
            discount_type: DiscountType::Fixed,
            discount_value: Decimal::ZERO,
            ..terms()
        };
        assert!(validate_terms(&free).is_err());
    }
}
