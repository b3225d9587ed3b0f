//! Order service: checkout, history, cancellation and admin status changes.
//!
//! Checkout, cancellation and admin status changes each run in one
//! transaction with the touched product rows locked. Once stock has moved the
//! catalog cache is cleared so product reads show the new levels.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use tracing::{info, instrument};

use shopfront_core::pricing::{
    CouponDiscount, CouponRejection, LineAmount, OrderTotals, PricingRules, best_offer,
};
use shopfront_core::{CategoryId, OfferId, OrderId, OrderStatus, ProductId, UserId};

use crate::db::orders::{NewOrder, NewOrderItem};
use crate::db::products::LockedProduct;
use crate::db::{
    CartRepository, CouponRepository, OfferRepository, OrderRepository, ProductRepository,
    RepositoryError,
};
use crate::models::coupon::normalize_code;
use crate::models::{Offer, Order, OrderDetail, Page, PageParams, ShippingAddress};
use super::catalog::CatalogCache;

/// Characters used in the random part of an order number.
const ORDER_NUMBER_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Missing shipping address fields: {}", .0.join(", "))]
    InvalidAddress(Vec<&'static str>),

    #[error("Product is no longer available: {0}")]
    ProductUnavailable(String),

    #[error("Insufficient stock for {product} (available: {available})")]
    InsufficientStock { product: String, available: i32 },

    /// A stock level changed under a concurrent order.
    #[error("Insufficient stock")]
    StockConflict,

    #[error("Invalid coupon code")]
    InvalidCoupon,

    #[error("{0}")]
    CouponRejected(#[from] CouponRejection),

    #[error("Order not found")]
    NotFound,

    #[error("You can only cancel your own orders")]
    Forbidden,

    #[error("Order cannot be cancelled in status {}", .0.as_str())]
    NotCancellable(OrderStatus),

    #[error("Cannot change order status from {} to {}", .from.as_str(), .to.as_str())]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Checkout payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderInput {
    #[serde(default)]
    pub shipping_address: ShippingAddress,
    pub coupon_code: Option<String>,
    pub notes: Option<String>,
}

/// A cart line priced for checkout.
#[derive(Debug, Clone)]
struct PricedLine {
    product_id: ProductId,
    name: String,
    amount: LineAmount,
    offer_id: Option<OfferId>,
}

/// Order service.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    cache: &'a CatalogCache,
    orders: OrderRepository<'a>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CatalogCache) -> Self {
        Self {
            pool,
            cache,
            orders: OrderRepository::new(pool),
        }
    }

    /// Turn the user's cart into an order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart`, `OrderError::InvalidAddress`,
    /// `OrderError::ProductUnavailable`, `OrderError::InsufficientStock` or a
    /// coupon error; nothing is written in that case.
    #[instrument(skip(self, input, rules), fields(user_id = %user_id))]
    pub async fn create_from_cart(
        &self,
        user_id: UserId,
        input: &CreateOrderInput,
        rules: &PricingRules,
    ) -> Result<OrderDetail, OrderError> {
        let missing = input.shipping_address.missing_fields();
        if !missing.is_empty() {
            return Err(OrderError::InvalidAddress(missing));
        }

        let mut tx = self.pool.begin().await?;

        let rows = CartRepository::lock_user_cart(&mut tx, user_id).await?;
        if rows.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let product_ids: Vec<ProductId> = rows.iter().map(|r| r.product_id).collect();
        let products = ProductRepository::lock_many(&mut tx, &product_ids).await?;
        let products: HashMap<ProductId, LockedProduct> =
            products.into_iter().map(|p| (p.id, p)).collect();

        let category_ids: Vec<CategoryId> = products
            .values()
            .filter_map(|p| p.category_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let offers = OfferRepository::lock_live_for(&mut tx, &product_ids, &category_ids).await?;

        let now = Utc::now();
        let mut lines = Vec::with_capacity(rows.len());
        for row in &rows {
            let product = match products.get(&row.product_id) {
                Some(p) if p.is_active => p,
                Some(p) => return Err(OrderError::ProductUnavailable(p.name.clone())),
                None => return Err(OrderError::ProductUnavailable(row.product_id.to_string())),
            };
            lines.push(price_line(product, row.quantity, &offers, now)?);
        }

        let amounts: Vec<LineAmount> = lines.iter().map(|l| l.amount).collect();
        let subtotal = OrderTotals::compute(&amounts, None, rules).subtotal;

        let coupon_code = input
            .coupon_code
            .as_deref()
            .map(normalize_code)
            .filter(|c| !c.is_empty());
        let (coupon, discount): (_, Option<CouponDiscount>) = match &coupon_code {
            Some(code) => {
                let coupon = CouponRepository::lock_by_code(&mut tx, code)
                    .await?
                    .ok_or(OrderError::InvalidCoupon)?;
                let discount = coupon.terms().apply(subtotal, now)?;
                (Some(coupon), Some(discount))
            }
            None => (None, None),
        };

        let totals = OrderTotals::compute(&amounts, discount.as_ref(), rules);
        let order_number = generate_order_number();

        let order = OrderRepository::insert(
            &mut tx,
            &NewOrder {
                order_number: &order_number,
                user_id,
                totals,
                coupon_id: coupon.as_ref().map(|c| c.id),
                coupon_code: coupon.as_ref().map(|c| c.code.as_str()),
                shipping_address: &input.shipping_address,
                notes: input.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()),
            },
        )
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let quantity = i32::try_from(line.amount.quantity).unwrap_or(i32::MAX);
            let item = OrderRepository::insert_item(
                &mut tx,
                order.id,
                &NewOrderItem {
                    product_id: line.product_id,
                    product_name: &line.name,
                    unit_price: line.amount.unit_price,
                    quantity,
                    total_price: line.amount.total(),
                },
            )
            .await?;
            adjust_stock(&mut tx, line.product_id, -quantity).await?;
            items.push(item);
        }

        if let Some(coupon) = &coupon {
            CouponRepository::record_use(&mut tx, coupon.id).await?;
        }
        let used_offers: Vec<OfferId> = lines
            .iter()
            .filter_map(|l| l.offer_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        OfferRepository::record_uses(&mut tx, &used_offers).await?;

        CartRepository::clear_user_cart(&mut tx, user_id).await?;
        tx.commit().await?;
        self.cache.invalidate_all().await;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total,
            "Order placed"
        );
        Ok(OrderDetail { order, items })
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if a query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        params: PageParams,
    ) -> Result<Page<Order>, OrderError> {
        let (orders, total) = self.orders.list_for_user(user_id, params).await?;
        Ok(Page::new(orders, total, params))
    }

    /// One of the user's orders with its lines.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist or belongs to
    /// another user.
    pub async fn detail_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<OrderDetail, OrderError> {
        let order = self
            .orders
            .get_by_id(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(OrderError::NotFound)?;
        let items = self.orders.items(order.id).await?;
        Ok(OrderDetail { order, items })
    }

    /// Cancel one of the user's orders and put the stock back.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Forbidden` for another user's order and
    /// `OrderError::NotCancellable` once the order has shipped.
    #[instrument(skip(self), fields(user_id = %user_id, order_id = %order_id))]
    pub async fn cancel(&self, user_id: UserId, order_id: OrderId) -> Result<OrderDetail, OrderError> {
        let mut tx = self.pool.begin().await?;

        let order = OrderRepository::lock(&mut tx, order_id)
            .await?
            .ok_or(OrderError::NotFound)?;
        if order.user_id != user_id {
            return Err(OrderError::Forbidden);
        }
        if !order.status.is_cancellable() {
            return Err(OrderError::NotCancellable(order.status));
        }

        let detail = cancel_locked(&mut tx, order).await?;
        tx.commit().await?;
        self.cache.invalidate_all().await;

        info!("Order cancelled by customer");
        Ok(detail)
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// All orders, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if a query fails.
    pub async fn admin_list(
        &self,
        status: Option<OrderStatus>,
        params: PageParams,
    ) -> Result<Page<Order>, OrderError> {
        let (orders, total) = self.orders.list_all(status, params).await?;
        Ok(Page::new(orders, total, params))
    }

    /// Any order with its lines.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist.
    pub async fn admin_detail(&self, order_id: OrderId) -> Result<OrderDetail, OrderError> {
        let order = self
            .orders
            .get_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;
        let items = self.orders.items(order.id).await?;
        Ok(OrderDetail { order, items })
    }

    /// Move an order to `next`. Cancelling puts the stock back.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` for a move the lifecycle does
    /// not allow.
    #[instrument(skip(self), fields(order_id = %order_id, status = next.as_str()))]
    pub async fn admin_set_status(
        &self,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<OrderDetail, OrderError> {
        let mut tx = self.pool.begin().await?;

        let order = OrderRepository::lock(&mut tx, order_id)
            .await?
            .ok_or(OrderError::NotFound)?;
        if !order.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: next,
            });
        }

        let detail = if next == OrderStatus::Cancelled {
            cancel_locked(&mut tx, order).await?
        } else {
            let order = OrderRepository::set_status(&mut tx, order_id, next).await?;
            let items = OrderRepository::items_in(&mut tx, order_id).await?;
            OrderDetail { order, items }
        };
        tx.commit().await?;
        if next == OrderStatus::Cancelled {
            self.cache.invalidate_all().await;
        }

        info!("Order status changed");
        Ok(detail)
    }
}

/// Restock an order's lines and mark it cancelled.
async fn cancel_locked(conn: &mut PgConnection, order: Order) -> Result<OrderDetail, OrderError> {
    let items = OrderRepository::items_in(conn, order.id).await?;
    for item in &items {
        // Lines of deleted products have no product to restock
        if let Some(product_id) = item.product_id {
            adjust_stock(conn, product_id, item.quantity).await?;
        }
    }
    let order = OrderRepository::set_status(conn, order.id, OrderStatus::Cancelled).await?;
    Ok(OrderDetail { order, items })
}

/// Change a product's stock, reporting the stock check constraint as its own error.
async fn adjust_stock(
    conn: &mut PgConnection,
    product_id: ProductId,
    delta: i32,
) -> Result<(), OrderError> {
    ProductRepository::adjust_stock(conn, product_id, delta)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => OrderError::StockConflict,
            other => OrderError::Repository(other),
        })
}

/// Check stock and apply the best live offer to one cart line.
fn price_line(
    product: &LockedProduct,
    quantity: i32,
    offers: &[Offer],
    now: chrono::DateTime<Utc>,
) -> Result<PricedLine, OrderError> {
    if quantity > product.stock_quantity {
        return Err(OrderError::InsufficientStock {
            product: product.name.clone(),
            available: product.stock_quantity,
        });
    }

    let applicable: Vec<&Offer> = offers
        .iter()
        .filter(|o| o.applies_to(product.id, product.category_id))
        .collect();
    let terms: Vec<_> = applicable.iter().map(|o| o.terms()).collect();
    let (unit_price, offer_id) = match best_offer(product.price, &terms, now) {
        Some((idx, price)) => (price, applicable.get(idx).map(|o| o.id)),
        None => (product.price, None),
    };

    Ok(PricedLine {
        product_id: product.id,
        name: product.name.clone(),
        amount: LineAmount {
            unit_price,
            quantity: u32::try_from(quantity).unwrap_or(0),
        },
        offer_id,
    })
}

/// A new order number, `ORD-YYYYMMDD-XXXXXX`.
fn generate_order_number() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..6)
        .filter_map(|_| ORDER_NUMBER_ALPHABET.choose(&mut rng).copied().map(char::from))
        .collect();
    format!("ORD-{}-{suffix}", Utc::now().format("%Y%m%d"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use shopfront_core::DiscountType;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn locked(stock: i32) -> LockedProduct {
        LockedProduct {
            id: ProductId::new(7),
            name: "Teapot".to_string(),
            price: dec("40.00"),
            category_id: Some(CategoryId::new(2)),
            stock_quantity: stock,
            is_active: true,
        }
    }

    fn category_offer(percent: &str) -> Offer {
        Offer {
            id: OfferId::new(3),
            title: "Kitchen week".to_string(),
            description: None,
            discount_type: DiscountType::Percentage,
            discount_value: dec(percent),
            product_id: None,
            category_id: Some(CategoryId::new(2)),
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
    fn test_order_number_format() {
        let number = generate_order_number();
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].bytes().all(|b| ORDER_NUMBER_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_price_line_rejects_insufficient_stock() {
        let err = price_line(&locked(1), 2, &[], Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Insufficient stock for Teapot (available: 1)");
    }

    #[test]
    fn test_price_line_applies_category_offer() {
        let line = price_line(&locked(5), 2, &[category_offer("25")], Utc::now()).unwrap();
        assert_eq!(line.amount.unit_price, dec("30.00"));
        assert_eq!(line.amount.total(), dec("60.00"));
        assert_eq!(line.offer_id, Some(OfferId::new(3)));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            OrderError::InvalidAddress(vec!["city", "country"]).to_string(),
            "Missing shipping address fields: city, country"
        );
        assert_eq!(
            OrderError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Pending,
            }
            .to_string(),
            "Cannot change order status from delivered to pending"
        );
    }
}
