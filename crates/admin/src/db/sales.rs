//! Sales data for the dashboard.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use atelier_core::sales::{SaleLine, SaleRecord};
use atelier_core::{OrderId, OrderStatus, ProductId};

use super::{RepositoryError, to_price, to_u32};

#[derive(Debug, sqlx::FromRow)]
struct SaleOrderRow {
    id: i32,
    status: OrderStatus,
    total: Decimal,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct SaleLineRow {
    order_id: i32,
    product_id: i32,
    product_name: String,
    quantity: i32,
    line_total: Decimal,
}

impl TryFrom<SaleLineRow> for SaleLine {
    type Error = RepositoryError;

    fn try_from(row: SaleLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            quantity: to_u32(row.quantity, "quantity")?,
            line_total: to_price(row.line_total, "line_total")?,
        })
    }
}

/// Repository for dashboard sales data.
pub struct SalesRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SalesRepository<'a> {
    /// Create a new sales repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every order created in `since..until`, with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn records(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<SaleRecord>, RepositoryError> {
        let orders: Vec<SaleOrderRow> = sqlx::query_as(
            r"
            SELECT id, status, total, created_at
            FROM shop.customer_order
            WHERE created_at >= $1 AND created_at < $2
            ORDER BY created_at, id
            ",
        )
        .bind(since)
        .bind(until)
        .fetch_all(self.pool)
        .await?;

        let lines: Vec<SaleLineRow> = sqlx::query_as(
            r"
            SELECT l.order_id, l.product_id, l.product_name, l.quantity, l.line_total
            FROM shop.order_line l
            JOIN shop.customer_order o ON o.id = l.order_id
            WHERE o.created_at >= $1 AND o.created_at < $2
            ORDER BY l.id
            ",
        )
        .bind(since)
        .bind(until)
        .fetch_all(self.pool)
        .await?;

        let mut lines_by_order: HashMap<i32, Vec<SaleLine>> = HashMap::new();
        for row in lines {
            let order_id = row.order_id;
            lines_by_order
                .entry(order_id)
                .or_default()
                .push(SaleLine::try_from(row)?);
        }

        orders
            .into_iter()
            .map(|row| {
                Ok(SaleRecord {
                    order_id: OrderId::new(row.id),
                    status: row.status,
                    created_at: row.created_at,
                    total: to_price(row.total, "total")?,
                    lines: lines_by_order.remove(&row.id).unwrap_or_default(),
                })
            })
            .collect()
    }
}
