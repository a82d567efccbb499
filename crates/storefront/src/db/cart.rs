//! Cart repository.
//!
//! Each mutation locks the shopper, then the product row, loads the shopper's
//! lines for that product, applies the [`Cart`] rule and writes back only the
//! affected row. The shopper lock orders concurrent mutations of one cart, so
//! the stock ceiling holds across sizes and no write is lost.

use sqlx::{PgConnection, PgPool};
use thiserror::Error;

use atelier_core::cart::{Cart, CartError, CartKey, CartLine, PricedCart};
use atelier_core::{ProductId, UserId};

use super::products::{self, ProductRepository};
use super::{RepositoryError, to_i32, to_u32, users};

/// Errors from a cart mutation.
#[derive(Debug, Error)]
pub enum CartUpdateError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Cart(#[from] CartError),
}

impl From<sqlx::Error> for CartUpdateError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    product_id: i32,
    size: String,
    quantity: i32,
}

impl TryFrom<CartItemRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: ProductId::new(row.product_id),
            size: (!row.size.is_empty()).then_some(row.size),
            quantity: to_u32(row.quantity, "cart quantity")?,
        })
    }
}

/// Stored form of an optional size.
fn size_column(size: Option<&str>) -> &str {
    size.unwrap_or("")
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for a shopper's cart.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All cart lines for a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_lines(&mut conn, user_id).await
    }

    /// The cart joined with current product names and prices.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn priced(&self, user_id: UserId) -> Result<PricedCart, RepositoryError> {
        let lines = self.lines(user_id).await?;
        let mut ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let products = ProductRepository::new(self.pool).get_many(&ids).await?;
        Ok(PricedCart::new(&lines, &products))
    }

    /// Total units in the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM shop.cart_item WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        u64::try_from(count)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative cart count: {count}")))
    }

    /// Add units of a product, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist, or a
    /// `CartError` when the cart rule rejects the change.
    #[tracing::instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        size: Option<&str>,
        quantity: u32,
    ) -> Result<CartLine, CartUpdateError> {
        let mut tx = self.pool.begin().await?;

        users::lock_shopper(&mut tx, user_id).await?;
        let product = products::lock_for_share(&mut tx, product_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let mut cart = Cart::from_lines(load_product_lines(&mut tx, user_id, product_id).await?);
        let line = cart.add(&product, size, quantity)?;
        upsert_line(&mut tx, user_id, &line).await?;

        tx.commit().await?;
        Ok(line)
    }

    /// Set the quantity of an existing line. Zero removes it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist, or a
    /// `CartError` when the line is missing or the new quantity is rejected.
    #[tracing::instrument(skip(self), fields(user_id = %user_id, product_id = %key.product_id))]
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        key: &CartKey,
        quantity: u32,
    ) -> Result<Option<CartLine>, CartUpdateError> {
        let mut tx = self.pool.begin().await?;

        users::lock_shopper(&mut tx, user_id).await?;
        let product = products::lock_for_share(&mut tx, key.product_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let mut cart =
            Cart::from_lines(load_product_lines(&mut tx, user_id, key.product_id).await?);
        let line = cart.set_quantity(key, quantity, &product)?;
        match &line {
            Some(line) => upsert_line(&mut tx, user_id, line).await?,
            None => delete_line(&mut tx, user_id, key).await?,
        }

        tx.commit().await?;
        Ok(line)
    }

    /// Remove a line. Removing a line that is not there is not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove(&self, user_id: UserId, key: &CartKey) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        users::lock_shopper(&mut tx, user_id).await?;
        delete_line(&mut tx, user_id, key).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Load every cart line for a user inside the caller's connection.
pub(crate) async fn load_lines(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Vec<CartLine>, RepositoryError> {
    let rows: Vec<CartItemRow> = sqlx::query_as(
        r"
        SELECT product_id, size, quantity
        FROM shop.cart_item
        WHERE user_id = $1
        ORDER BY added_at, product_id, size
        ",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(CartLine::try_from).collect()
}

/// Delete every cart line for a user.
pub(crate) async fn clear(conn: &mut PgConnection, user_id: UserId) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM shop.cart_item WHERE user_id = $1")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

async fn load_product_lines(
    conn: &mut PgConnection,
    user_id: UserId,
    product_id: ProductId,
) -> Result<Vec<CartLine>, RepositoryError> {
    let rows: Vec<CartItemRow> = sqlx::query_as(
        r"
        SELECT product_id, size, quantity
        FROM shop.cart_item
        WHERE user_id = $1 AND product_id = $2
        ORDER BY added_at, size
        FOR UPDATE
        ",
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(CartLine::try_from).collect()
}

async fn upsert_line(
    conn: &mut PgConnection,
    user_id: UserId,
    line: &CartLine,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO shop.cart_item (user_id, product_id, size, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, product_id, size)
        DO UPDATE SET quantity = EXCLUDED.quantity
        ",
    )
    .bind(user_id)
    .bind(line.product_id)
    .bind(size_column(line.size.as_deref()))
    .bind(to_i32(line.quantity, "cart quantity")?)
    .execute(conn)
    .await?;
    Ok(())
}

async fn delete_line(
    conn: &mut PgConnection,
    user_id: UserId,
    key: &CartKey,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM shop.cart_item WHERE user_id = $1 AND product_id = $2 AND size = $3")
        .bind(user_id)
        .bind(key.product_id)
        .bind(size_column(key.size.as_deref()))
        .execute(conn)
        .await?;
    Ok(())
}
