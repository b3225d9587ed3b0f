//! Cart repository.
//!
//! Every query is scoped to a [`CartOwner`]: `$1` is the user ID and `$2`
//! the guest session ID, exactly one of which is non-null.

use sqlx::{PgConnection, PgPool};

use shopfront_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::{CartItem, CartOwner};

const OWNER_FILTER: &str =
    "(($1::INT IS NOT NULL AND c.user_id = $1) OR ($2::TEXT IS NOT NULL AND c.session_id = $2))";

/// A cart row locked for checkout.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct LockedCartRow {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Cart rows with their products, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, owner: &CartOwner) -> Result<Vec<CartItem>, RepositoryError> {
        let (user_id, session_id) = owner.keys();
        let items = sqlx::query_as::<_, CartItem>(&format!(
            "SELECT c.id, c.product_id, c.quantity,
                    p.name, p.slug, p.price, p.category_id, p.images, p.stock_quantity, p.is_active
             FROM cart c
             JOIN products p ON p.id = c.product_id
             WHERE {OWNER_FILTER}
             ORDER BY c.created_at, c.id"
        ))
        .bind(user_id)
        .bind(session_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Quantity of a product already in the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn quantity_of(
        &self,
        owner: &CartOwner,
        product_id: ProductId,
    ) -> Result<Option<i32>, RepositoryError> {
        let (user_id, session_id) = owner.keys();
        let quantity = sqlx::query_scalar::<_, i32>(&format!(
            "SELECT c.quantity FROM cart c WHERE {OWNER_FILTER} AND c.product_id = $3"
        ))
        .bind(user_id)
        .bind(session_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(quantity)
    }

    /// Insert a cart row or overwrite its quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_quantity(
        &self,
        owner: &CartOwner,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let sql = match owner {
            CartOwner::User(_) => {
                "INSERT INTO cart (user_id, session_id, product_id, quantity)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (user_id, product_id) WHERE user_id IS NOT NULL
                 DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()"
            }
            CartOwner::Guest(_) => {
                "INSERT INTO cart (user_id, session_id, product_id, quantity)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (session_id, product_id) WHERE session_id IS NOT NULL
                 DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()"
            }
        };

        let (user_id, session_id) = owner.keys();
        sqlx::query(sql)
            .bind(user_id)
            .bind(session_id)
            .bind(product_id)
            .bind(quantity)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Add `quantity` to a cart row, inserting it if needed, and return the
    /// resulting quantity.
    ///
    /// The increment happens in the upsert itself, so concurrent adds for the
    /// same line accumulate.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_quantity(
        conn: &mut PgConnection,
        owner: &CartOwner,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<i32, RepositoryError> {
        let sql = match owner {
            CartOwner::User(_) => {
                "INSERT INTO cart (user_id, session_id, product_id, quantity)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (user_id, product_id) WHERE user_id IS NOT NULL
                 DO UPDATE SET quantity = cart.quantity + EXCLUDED.quantity, updated_at = NOW()
                 RETURNING quantity"
            }
            CartOwner::Guest(_) => {
                "INSERT INTO cart (user_id, session_id, product_id, quantity)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (session_id, product_id) WHERE session_id IS NOT NULL
                 DO UPDATE SET quantity = cart.quantity + EXCLUDED.quantity, updated_at = NOW()
                 RETURNING quantity"
            }
        };

        let (user_id, session_id) = owner.keys();
        let total = sqlx::query_scalar::<_, i32>(sql)
            .bind(user_id)
            .bind(session_id)
            .bind(product_id)
            .bind(quantity)
            .fetch_one(conn)
            .await?;

        Ok(total)
    }

    /// Remove a product from the cart. Returns whether a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(
        &self,
        owner: &CartOwner,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let (user_id, session_id) = owner.keys();
        let result = sqlx::query(&format!(
            "DELETE FROM cart c WHERE {OWNER_FILTER} AND c.product_id = $3"
        ))
        .bind(user_id)
        .bind(session_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, owner: &CartOwner) -> Result<u64, RepositoryError> {
        let (user_id, session_id) = owner.keys();
        let result = sqlx::query(&format!("DELETE FROM cart c WHERE {OWNER_FILTER}"))
            .bind(user_id)
            .bind(session_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Move a guest session's rows into a user's cart.
    ///
    /// Quantities of products present in both carts are summed. Every merged
    /// quantity is capped at the product's stock and out-of-stock rows are
    /// dropped. Returns the number of guest rows merged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn merge_guest_into_user(
        &self,
        session_id: &str,
        user_id: UserId,
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let merged = sqlx::query(
            "INSERT INTO cart (user_id, product_id, quantity)
             SELECT $2, g.product_id, LEAST(g.quantity, p.stock_quantity)
             FROM cart g
             JOIN products p ON p.id = g.product_id
             WHERE g.session_id = $1 AND p.stock_quantity > 0
             ON CONFLICT (user_id, product_id) WHERE user_id IS NOT NULL
             DO UPDATE SET
                 quantity = LEAST(
                     cart.quantity + EXCLUDED.quantity,
                     (SELECT stock_quantity FROM products WHERE id = EXCLUDED.product_id)
                 ),
                 updated_at = NOW()",
        )
        .bind(session_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("DELETE FROM cart WHERE session_id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(merged)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Lock a user's cart rows for the rest of the transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_user_cart(
        conn: &mut PgConnection,
        user_id: UserId,
    ) -> Result<Vec<LockedCartRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, LockedCartRow>(
            "SELECT product_id, quantity FROM cart
             WHERE user_id = $1
             ORDER BY product_id
             FOR UPDATE",
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(rows)
    }

    /// Empty a user's cart inside a transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear_user_cart(
        conn: &mut PgConnection,
        user_id: UserId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart WHERE user_id = $1")
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(())
    }
}
