//! Inventory repository: stock adjustments with an audit trail.
//!
//! Every stock write outside checkout and cancellation goes through here and
//! records a row in `shop.inventory_adjustment`.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use thiserror::Error;

use atelier_core::stock::MAX_STOCK;
use atelier_core::{AdminUserId, ProductId, Slug};

use super::{RepositoryError, to_i32, to_u32};
use crate::models::{InventoryAdjustment, LowStockProduct};

/// Errors from a stock change.
#[derive(Debug, Error)]
pub enum StockChangeError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Applying the delta would take stock below zero.
    #[error("cannot apply {delta} to stock of {stock}")]
    WouldGoNegative { stock: u32, delta: i32 },

    /// Applying the delta would exceed the largest storable stock.
    #[error("cannot apply {delta} to stock of {stock}: at most {max} units fit", max = MAX_STOCK)]
    WouldOverflow { stock: u32, delta: i32 },
}

impl From<sqlx::Error> for StockChangeError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct AdjustmentRow {
    id: i32,
    product_id: i32,
    admin_user_id: i32,
    delta: i32,
    stock_after: i32,
    reason: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AdjustmentRow> for InventoryAdjustment {
    type Error = RepositoryError;

    fn try_from(row: AdjustmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            product_id: ProductId::new(row.product_id),
            admin_user_id: AdminUserId::new(row.admin_user_id),
            delta: row.delta,
            stock_after: to_u32(row.stock_after, "stock_after")?,
            reason: row.reason,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LowStockRow {
    id: i32,
    slug: String,
    name: String,
    category: String,
    stock: i32,
}

impl TryFrom<LowStockRow> for LowStockProduct {
    type Error = RepositoryError;

    fn try_from(row: LowStockRow) -> Result<Self, Self::Error> {
        let slug = Slug::parse(&row.slug).map_err(|e| {
            RepositoryError::DataCorruption(format!("product {}: invalid slug: {e}", row.id))
        })?;
        Ok(Self {
            id: ProductId::new(row.id),
            slug,
            name: row.name,
            category: row.category,
            stock: to_u32(row.stock, "stock")?,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for stock levels.
pub struct InventoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InventoryRepository<'a> {
    /// Create a new inventory repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add `delta` (possibly negative) to a product's stock.
    ///
    /// The change is a single guarded `UPDATE` computed in `BIGINT`, so
    /// concurrent checkouts and adjustments can never drive stock below zero
    /// or past [`MAX_STOCK`].
    ///
    /// # Errors
    ///
    /// Returns `StockChangeError::WouldGoNegative` if stock is too low for a
    /// negative delta, `StockChangeError::WouldOverflow` if the result would not
    /// fit, and `RepositoryError::NotFound` for an unknown product.
    #[tracing::instrument(skip(self, reason), fields(product_id = %product_id, admin_id = %admin_id))]
    pub async fn adjust(
        &self,
        product_id: ProductId,
        admin_id: AdminUserId,
        delta: i32,
        reason: &str,
    ) -> Result<InventoryAdjustment, StockChangeError> {
        let mut tx = self.pool.begin().await?;

        let stock_after: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE shop.product
            SET stock = (stock::BIGINT + $2)::INTEGER, updated_at = NOW()
            WHERE id = $1 AND stock::BIGINT + $2 BETWEEN 0 AND $3
            RETURNING stock
            ",
        )
        .bind(product_id)
        .bind(i64::from(delta))
        .bind(i64::from(MAX_STOCK))
        .fetch_optional(&mut *tx)
        .await?;

        let Some(stock_after) = stock_after else {
            let stock = current_stock(&mut tx, product_id)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            return Err(out_of_range(stock, delta));
        };

        let adjustment =
            record_adjustment(&mut tx, product_id, admin_id, delta, stock_after, reason).await?;
        tx.commit().await?;

        tracing::info!(delta, stock_after, "Stock adjusted");
        Ok(adjustment)
    }

    /// Set a product's stock to an absolute count.
    ///
    /// Recorded as an adjustment of the difference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown product.
    #[tracing::instrument(skip(self, reason), fields(product_id = %product_id, admin_id = %admin_id))]
    pub async fn set_stock(
        &self,
        product_id: ProductId,
        admin_id: AdminUserId,
        stock: u32,
        reason: &str,
    ) -> Result<InventoryAdjustment, RepositoryError> {
        let new_stock = to_i32(stock, "stock")?;
        let mut tx = self.pool.begin().await?;

        let current: i32 =
            sqlx::query_scalar("SELECT stock FROM shop.product WHERE id = $1 FOR UPDATE")
                .bind(product_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        sqlx::query("UPDATE shop.product SET stock = $2, updated_at = NOW() WHERE id = $1")
            .bind(product_id)
            .bind(new_stock)
            .execute(&mut *tx)
            .await?;

        let delta = new_stock - current;
        let adjustment =
            record_adjustment(&mut tx, product_id, admin_id, delta, new_stock, reason).await?;
        tx.commit().await?;

        tracing::info!(from = current, to = new_stock, "Stock set");
        Ok(adjustment)
    }

    /// Active products with stock at or below `threshold`, lowest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock(&self, threshold: u32) -> Result<Vec<LowStockProduct>, RepositoryError> {
        let rows: Vec<LowStockRow> = sqlx::query_as(
            r"
            SELECT id, slug, name, category, stock
            FROM shop.product
            WHERE active AND stock <= $1
            ORDER BY stock, id
            ",
        )
        .bind(i64::from(threshold))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Most recent adjustments for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn history(
        &self,
        product_id: ProductId,
        limit: i64,
    ) -> Result<Vec<InventoryAdjustment>, RepositoryError> {
        let rows: Vec<AdjustmentRow> = sqlx::query_as(
            r"
            SELECT id, product_id, admin_user_id, delta, stock_after, reason, created_at
            FROM shop.inventory_adjustment
            WHERE product_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            ",
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

/// Why a guarded delta was refused, given the stock it was refused against.
fn out_of_range(stock: u32, delta: i32) -> StockChangeError {
    if delta < 0 {
        StockChangeError::WouldGoNegative { stock, delta }
    } else {
        StockChangeError::WouldOverflow { stock, delta }
    }
}

async fn current_stock(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> Result<Option<u32>, RepositoryError> {
    let stock: Option<i32> = sqlx::query_scalar("SELECT stock FROM shop.product WHERE id = $1")
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    stock.map(|s| to_u32(s, "stock")).transpose()
}

async fn record_adjustment(
    conn: &mut PgConnection,
    product_id: ProductId,
    admin_id: AdminUserId,
    delta: i32,
    stock_after: i32,
    reason: &str,
) -> Result<InventoryAdjustment, RepositoryError> {
    let row: AdjustmentRow = sqlx::query_as(
        r"
        INSERT INTO shop.inventory_adjustment
            (product_id, admin_user_id, delta, stock_after, reason)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, product_id, admin_user_id, delta, stock_after, reason, created_at
        ",
    )
    .bind(product_id)
    .bind(admin_id)
    .bind(delta)
    .bind(stock_after)
    .bind(reason)
    .fetch_one(conn)
    .await?;

    row.try_into()
}
