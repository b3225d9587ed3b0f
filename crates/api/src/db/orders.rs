//! Order repository.

use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use shopfront_core::pricing::OrderTotals;
use shopfront_core::{CouponId, OrderId, OrderStatus, PaymentStatus, ProductId, UserId};

use super::{RepositoryError, page_offset};
use crate::models::{Order, OrderItem, PageParams, ShippingAddress};

const ORDER_COLUMNS: &str = "id, order_number, user_id, status, payment_status, subtotal, \
     discount_amount, shipping_amount, tax_amount, total, coupon_id, coupon_code, \
     shipping_address, notes, payment_intent_id, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, order_id, product_id, product_name, unit_price, quantity, total_price";

/// Header fields of a new order.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub order_number: &'a str,
    pub user_id: UserId,
    pub totals: OrderTotals,
    pub coupon_id: Option<CouponId>,
    pub coupon_code: Option<&'a str>,
    pub shipping_address: &'a ShippingAddress,
    pub notes: Option<&'a str>,
}

/// A priced line of a new order.
#[derive(Debug, Clone)]
pub struct NewOrderItem<'a> {
    pub product_id: ProductId,
    pub product_name: &'a str,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub total_price: Decimal,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Lines of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        params: PageParams,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(i64::from(params.per_page()))
        .bind(page_offset(params.page(), params.per_page()))
        .fetch_all(self.pool)
        .await?;

        Ok((orders, total))
    }

    /// All orders, optionally filtered by status, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(
        &self,
        status: Option<OrderStatus>,
        params: PageParams,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE ($1::order_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE ($1::order_status IS NULL OR status = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(status)
        .bind(i64::from(params.per_page()))
        .bind(page_offset(params.page(), params.per_page()))
        .fetch_all(self.pool)
        .await?;

        Ok((orders, total))
    }

    /// Find the order a payment intent was created for.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE payment_intent_id = $1"
        ))
        .bind(payment_intent_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Attach a payment intent to an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_payment_intent(
        &self,
        id: OrderId,
        payment_intent_id: &str,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET payment_intent_id = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(payment_intent_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "payment intent"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Record a payment outcome.
    ///
    /// When the payment succeeded, a pending order moves to processing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_payment_status(
        &self,
        id: OrderId,
        payment_status: PaymentStatus,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET
                 payment_status = $2,
                 status = CASE
                     WHEN $2 = 'paid'::payment_status AND status = 'pending' THEN 'processing'
                     ELSE status
                 END,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(payment_status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    // =========================================================================
    // Transactional operations
    // =========================================================================

    /// Insert an order header.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order number collides.
    pub async fn insert(
        conn: &mut PgConnection,
        order: &NewOrder<'_>,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders
                 (order_number, user_id, subtotal, discount_amount, shipping_amount, tax_amount,
                  total, coupon_id, coupon_code, shipping_address, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.order_number)
        .bind(order.user_id)
        .bind(order.totals.subtotal)
        .bind(order.totals.discount)
        .bind(order.totals.shipping)
        .bind(order.totals.tax)
        .bind(order.totals.total)
        .bind(order.coupon_id)
        .bind(order.coupon_code)
        .bind(Json(order.shipping_address))
        .bind(order.notes)
        .fetch_one(conn)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "order number"))
    }

    /// Insert one order line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert_item(
        conn: &mut PgConnection,
        order_id: OrderId,
        item: &NewOrderItem<'_>,
    ) -> Result<OrderItem, RepositoryError> {
        let item = sqlx::query_as::<_, OrderItem>(&format!(
            "INSERT INTO order_items
                 (order_id, product_id, product_name, unit_price, quantity, total_price)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.product_name)
        .bind(item.unit_price)
        .bind(item.quantity)
        .bind(item.total_price)
        .fetch_one(conn)
        .await?;

        Ok(item)
    }

    /// Lock an order row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock(conn: &mut PgConnection, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(order)
    }

    /// Lines of an order, inside a transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_in(
        conn: &mut PgConnection,
        order_id: OrderId,
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(conn)
        .await?;

        Ok(items)
    }

    /// Set an order's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_status(
        conn: &mut PgConnection,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(conn)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
