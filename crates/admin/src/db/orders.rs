//! Order repository: the staff view of orders and the status workflow.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;

use atelier_core::catalog::{Page, Pagination};
use atelier_core::checkout::ShippingDetails;
use atelier_core::order::{Actor, Order, OrderEvent, OrderLine, OrderSummary};
use atelier_core::stock;
use atelier_core::{AdminUserId, OrderId, OrderStatus, ProductId, TransitionError, UserId};

use super::{RepositoryError, to_price, to_u32};
use crate::models::OrderDetail;

/// Errors from a status change.
#[derive(Debug, Error)]
pub enum StatusChangeError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl From<sqlx::Error> for StatusChangeError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

const ORDER_COLUMNS: &str = "id, user_id, status, full_name, phone, address_line1, address_line2, \
     city, postal_code, country, subtotal, shipping_fee, total, created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    status: OrderStatus,
    full_name: String,
    phone: String,
    address_line1: String,
    address_line2: Option<String>,
    city: String,
    postal_code: String,
    country: String,
    subtotal: Decimal,
    shipping_fee: Decimal,
    total: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> Result<Order, RepositoryError> {
        Ok(Order {
            id: OrderId::new(self.id),
            user_id: UserId::new(self.user_id),
            status: self.status,
            lines,
            shipping: ShippingDetails {
                full_name: self.full_name,
                phone: self.phone,
                address_line1: self.address_line1,
                address_line2: self.address_line2,
                city: self.city,
                postal_code: self.postal_code,
                country: self.country,
            },
            subtotal: to_price(self.subtotal, "subtotal")?,
            shipping_fee: to_price(self.shipping_fee, "shipping_fee")?,
            total: to_price(self.total, "total")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    product_id: i32,
    product_name: String,
    size: Option<String>,
    unit_price: Decimal,
    quantity: i32,
    line_total: Decimal,
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = RepositoryError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            size: row.size,
            unit_price: to_price(row.unit_price, "unit_price")?,
            quantity: to_u32(row.quantity, "quantity")?,
            line_total: to_price(row.line_total, "line_total")?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderSummaryRow {
    id: i32,
    user_id: i32,
    status: OrderStatus,
    item_count: i64,
    total: Decimal,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderSummaryRow> for OrderSummary {
    type Error = RepositoryError;

    fn try_from(row: OrderSummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            status: row.status,
            item_count: u32::try_from(row.item_count).map_err(|_| {
                RepositoryError::DataCorruption(format!("order {}: bad item count", row.id))
            })?,
            total: to_price(row.total, "total")?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderEventRow {
    from_status: Option<OrderStatus>,
    to_status: OrderStatus,
    actor_kind: String,
    actor_id: Option<i32>,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderEventRow> for OrderEvent {
    type Error = RepositoryError;

    fn try_from(row: OrderEventRow) -> Result<Self, Self::Error> {
        let actor = Actor::from_parts(&row.actor_kind, row.actor_id).ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "invalid order event actor: {} {:?}",
                row.actor_kind, row.actor_id
            ))
        })?;
        Ok(Self {
            from: row.from_status,
            to: row.to_status,
            actor,
            note: row.note,
            at: row.created_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the staff order views.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A page of orders, newest first, optionally in one status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        pagination: Pagination,
    ) -> Result<Page<OrderSummary>, RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shop.customer_order WHERE ($1::shop.order_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        let rows: Vec<OrderSummaryRow> = sqlx::query_as(
            r"
            SELECT o.id, o.user_id, o.status, o.total, o.created_at,
                   COALESCE((SELECT SUM(l.quantity) FROM shop.order_line l
                             WHERE l.order_id = o.id), 0)::BIGINT AS item_count
            FROM shop.customer_order o
            WHERE ($1::shop.order_status IS NULL OR o.status = $1)
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(OrderSummary::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(
            items,
            pagination,
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    /// An order with its lines and status history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn detail(&self, order_id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_detail(&mut conn, order_id).await
    }

    /// Move an order to `to`, restocking when it is cancelled.
    ///
    /// The order row is locked `FOR UPDATE` so two staff members cannot
    /// race the same order; the status check, restock, update and history
    /// entry commit together.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown order,
    /// `RepositoryError::Conflict` when a cancelled order's units no longer fit
    /// in stock, and a `TransitionError` for a move the workflow does not allow.
    #[tracing::instrument(skip(self, note), fields(order_id = %order_id, to = %to, admin_id = %admin_id))]
    pub async fn change_status(
        &self,
        order_id: OrderId,
        to: OrderStatus,
        admin_id: AdminUserId,
        note: Option<&str>,
    ) -> Result<OrderDetail, StatusChangeError> {
        let mut tx = self.pool.begin().await?;

        let from: OrderStatus =
            sqlx::query_scalar("SELECT status FROM shop.customer_order WHERE id = $1 FOR UPDATE")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        let to = from.transition(to)?;
        if OrderStatus::restocks_on(to) {
            stock::restock_order(&mut tx, order_id)
                .await
                .map_err(RepositoryError::from)?;
        }
        sqlx::query("UPDATE shop.customer_order SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(order_id)
            .bind(to)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r"
            INSERT INTO shop.order_event (order_id, from_status, to_status, actor_kind, actor_id, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(order_id)
        .bind(from)
        .bind(to)
        .bind(Actor::Admin(admin_id).kind())
        .bind(Actor::Admin(admin_id).id())
        .bind(note)
        .execute(&mut *tx)
        .await?;

        let detail = load_detail(&mut tx, order_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;

        tracing::info!(from = %from, "Order status changed");
        Ok(detail)
    }
}

async fn load_detail(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Option<OrderDetail>, RepositoryError> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM shop.customer_order WHERE id = $1"
    ))
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let lines: Vec<OrderLineRow> = sqlx::query_as(
        r"
        SELECT product_id, product_name, size, unit_price, quantity, line_total
        FROM shop.order_line
        WHERE order_id = $1
        ORDER BY id
        ",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    let lines = lines
        .into_iter()
        .map(OrderLine::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let events: Vec<OrderEventRow> = sqlx::query_as(
        r"
        SELECT from_status, to_status, actor_kind, actor_id, note, created_at
        FROM shop.order_event
        WHERE order_id = $1
        ORDER BY id
        ",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    let events = events
        .into_iter()
        .map(OrderEvent::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(OrderDetail::new(row.into_order(lines)?, events)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn event_row(kind: &str, id: Option<i32>) -> OrderEventRow {
        OrderEventRow {
            from_status: Some(OrderStatus::Pending),
            to_status: OrderStatus::Processing,
            actor_kind: kind.to_owned(),
            actor_id: id,
            note: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_event_row_conversion() {
        let event = OrderEvent::try_from(event_row("admin", Some(3))).unwrap();
        assert_eq!(event.actor, Actor::Admin(AdminUserId::new(3)));
        assert_eq!(event.from, Some(OrderStatus::Pending));
        assert_eq!(event.to, OrderStatus::Processing);
    }

    #[test]
    fn test_event_row_with_bad_actor_is_corruption() {
        assert!(matches!(
            OrderEvent::try_from(event_row("admin", None)),
            Err(RepositoryError::DataCorruption(_))
        ));
        assert!(matches!(
            OrderEvent::try_from(event_row("robot", Some(1))),
            Err(RepositoryError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_summary_row_conversion() {
        let summary = OrderSummary::try_from(OrderSummaryRow {
            id: 10,
            user_id: 2,
            status: OrderStatus::Shipped,
            item_count: 4,
            total: Decimal::new(12000, 2),
            created_at: Utc::now(),
        })
        .unwrap();
        assert_eq!(summary.item_count, 4);
        assert_eq!(summary.status, OrderStatus::Shipped);
    }
}
