//! Shopping cart service.
//!
//! Carts belong to a signed-in user or to a guest session. Lines are priced
//! with the best live offer every time the cart is read.

use std::collections::HashSet;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, instrument};

use shopfront_core::pricing::{LineAmount, best_offer};
use shopfront_core::{CategoryId, ProductId, UserId, round_money};

use crate::db::{CartRepository, OfferRepository, ProductRepository, RepositoryError};
use crate::models::{CartItem, CartLine, CartOwner, CartView, Offer};

/// Largest quantity of a single product a cart may hold.
pub const MAX_LINE_QUANTITY: i32 = 999;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Insufficient stock")]
    InsufficientStock { available: i32 },

    #[error("Item not found in cart")]
    ItemNotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CartError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Cart service.
pub struct CartService<'a> {
    pool: &'a PgPool,
    cart: CartRepository<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            cart: CartRepository::new(pool),
        }
    }

    /// The priced cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if a query fails.
    #[instrument(skip(self))]
    pub async fn view(&self, owner: &CartOwner) -> Result<CartView, CartError> {
        let items: Vec<CartItem> = self
            .cart
            .items(owner)
            .await?
            .into_iter()
            .filter(|item| item.is_active)
            .collect();

        let product_ids: Vec<ProductId> = items.iter().map(|i| i.product_id).collect();
        let category_ids: Vec<CategoryId> = items
            .iter()
            .filter_map(|i| i.category_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let offers = if items.is_empty() {
            Vec::new()
        } else {
            OfferRepository::new(self.pool)
                .live_for(&product_ids, &category_ids)
                .await?
        };

        let session_id = match owner {
            CartOwner::Guest(session) => Some(session.clone()),
            CartOwner::User(_) => None,
        };

        Ok(build_view(session_id, items, &offers))
    }

    /// Add `quantity` of a product, on top of what is already in the cart.
    ///
    /// The product row stays locked until the new line quantity has been
    /// checked against stock; an add that would exceed it is rolled back.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` for an unknown or inactive product,
    /// `CartError::InvalidQuantity` for a quantity below 1 and
    /// `CartError::InsufficientStock` when the total exceeds stock.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        owner: &CartOwner,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }

        let mut tx = self.pool.begin().await?;

        let stock = ProductRepository::lock_one(&mut tx, product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(CartError::ProductNotFound)?
            .stock_quantity;
        check_stock(quantity, stock)?;

        let total = CartRepository::add_quantity(&mut tx, owner, product_id, quantity).await?;
        check_stock(total, stock)?;
        tx.commit().await?;

        debug!(%product_id, quantity = total, "Cart line updated");

        self.view(owner).await
    }

    /// Set the quantity of a product already in the cart. Zero removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the product is not in the cart and
    /// `CartError::InsufficientStock` when `quantity` exceeds stock.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        owner: &CartOwner,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        if quantity < 0 {
            return Err(CartError::InvalidQuantity);
        }
        if quantity == 0 {
            return self.remove(owner, product_id).await;
        }

        self.cart
            .quantity_of(owner, product_id)
            .await?
            .ok_or(CartError::ItemNotFound)?;

        let stock = self.active_stock(product_id).await?;
        check_stock(quantity, stock)?;

        self.cart.set_quantity(owner, product_id, quantity).await?;
        self.view(owner).await
    }

    /// Remove a product from the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the product is not in the cart.
    #[instrument(skip(self))]
    pub async fn remove(&self, owner: &CartOwner, product_id: ProductId) -> Result<CartView, CartError> {
        if !self.cart.remove(owner, product_id).await? {
            return Err(CartError::ItemNotFound);
        }
        self.view(owner).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if a query fails.
    #[instrument(skip(self))]
    pub async fn clear(&self, owner: &CartOwner) -> Result<CartView, CartError> {
        let removed = self.cart.clear(owner).await?;
        debug!(removed, "Cart cleared");
        self.view(owner).await
    }

    /// Move a guest cart into a user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if a query fails.
    #[instrument(skip(self, session_id))]
    pub async fn merge(&self, session_id: &str, user_id: UserId) -> Result<CartView, CartError> {
        let merged = self.cart.merge_guest_into_user(session_id, user_id).await?;
        debug!(merged, %user_id, "Guest cart merged");
        self.view(&CartOwner::User(user_id)).await
    }

    async fn active_stock(&self, product_id: ProductId) -> Result<i32, CartError> {
        let product = ProductRepository::new(self.pool)
            .get_by_id(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(CartError::ProductNotFound)?;
        Ok(product.stock_quantity)
    }
}

fn check_stock(quantity: i32, stock: i32) -> Result<(), CartError> {
    if quantity > stock || quantity > MAX_LINE_QUANTITY {
        return Err(CartError::InsufficientStock {
            available: stock.min(MAX_LINE_QUANTITY),
        });
    }
    Ok(())
}

/// Price cart rows and total them.
fn build_view(session_id: Option<String>, items: Vec<CartItem>, offers: &[Offer]) -> CartView {
    let now = Utc::now();
    let mut subtotal = Decimal::ZERO;
    let mut item_count = 0_i64;

    let lines = items
        .into_iter()
        .map(|item| {
            let applicable: Vec<_> = offers
                .iter()
                .filter(|o| o.applies_to(item.product_id, item.category_id))
                .map(Offer::terms)
                .collect();
            let unit_price = best_offer(item.price, &applicable, now)
                .map_or(item.price, |(_, price)| price);

            let line_total = LineAmount {
                unit_price,
                quantity: u32::try_from(item.quantity).unwrap_or(0),
            }
            .total();

            subtotal += line_total;
            item_count += i64::from(item.quantity);

            CartLine {
                id: item.id,
                product_id: item.product_id,
                image: item.images.0.first().cloned(),
                name: item.name,
                slug: item.slug,
                unit_price,
                quantity: item.quantity,
                line_total,
                stock_quantity: item.stock_quantity,
            }
        })
        .collect();

    CartView {
        session_id,
        items: lines,
        item_count,
        subtotal: round_money(subtotal),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use sqlx::types::Json;

    use shopfront_core::{CartItemId, DiscountType, OfferId};

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(id: i32, price: &str, quantity: i32, category: Option<i32>) -> CartItem {
        CartItem {
            id: CartItemId::new(id),
            product_id: ProductId::new(id),
            quantity,
            name: format!("Product {id}"),
            slug: format!("product-{id}"),
            price: dec(price),
            category_id: category.map(CategoryId::new),
            images: Json(vec![format!("/uploads/{id}.png")]),
            stock_quantity: 10,
            is_active: true,
        }
    }

    fn fixed_offer(product: i32, amount: &str) -> Offer {
        Offer {
            id: OfferId::new(1),
            title: "Sale".to_string(),
            description: None,
            discount_type: DiscountType::Fixed,
            discount_value: dec(amount),
            product_id: Some(ProductId::new(product)),
            category_id: None,
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
    fn test_check_stock() {
        assert!(check_stock(5, 5).is_ok());
        assert!(matches!(
            check_stock(6, 5),
            Err(CartError::InsufficientStock { available: 5 })
        ));
        assert!(check_stock(MAX_LINE_QUANTITY + 1, i32::MAX).is_err());
    }

    #[test]
    fn test_build_view_totals() {
        let items = vec![item(1, "10.00", 2, None), item(2, "4.50", 1, Some(3))];
        let view = build_view(Some("abc".to_string()), items, &[]);

        assert_eq!(view.session_id.as_deref(), Some("abc"));
        assert_eq!(view.item_count, 3);
        assert_eq!(view.subtotal, dec("24.50"));
        assert_eq!(view.items[0].line_total, dec("20.00"));
        assert_eq!(view.items[0].image.as_deref(), Some("/uploads/1.png"));
    }

    #[test]
    fn test_build_view_applies_offers() {
        let items = vec![item(1, "10.00", 3, None), item(2, "5.00", 1, None)];
        let view = build_view(None, items, &[fixed_offer(1, "2.50")]);

        assert_eq!(view.items[0].unit_price, dec("7.50"));
        assert_eq!(view.items[0].line_total, dec("22.50"));
        assert_eq!(view.items[1].unit_price, dec("5.00"));
        assert_eq!(view.subtotal, dec("27.50"));
    }

    #[test]
    fn test_empty_view_omits_session_for_users() {
        let view = build_view(None, Vec::new(), &[]);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("session_id").is_none());
        assert_eq!(json["item_count"], 0);
    }
}
