//! Order repository: checkout, order history and shopper cancellation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;

use atelier_core::cart::CartLine;
use atelier_core::catalog::{Page, Pagination};
use atelier_core::checkout::{CheckoutError, CheckoutPlan, ShippingDetails, ShippingPolicy};
use atelier_core::order::{self, Actor, Order, OrderLine, OrderSummary};
use atelier_core::stock;
use atelier_core::{OrderId, OrderStatus, ProductId, TransitionError, UserId};

use super::{RepositoryError, cart, products, to_i32, to_price, to_u32, users};

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

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

// =============================================================================
// Repository
// =============================================================================

/// Repository for a shopper's orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Turn the shopper's cart into an order.
    ///
    /// Runs in one transaction: the shopper is locked, the cart's products are
    /// locked `FOR UPDATE` in ascending ID order, stock is decremented with a guarded update, the
    /// order, its lines and its first event are inserted and the cart is
    /// emptied. Any error rolls all of it back.
    ///
    /// # Errors
    ///
    /// Returns a `CheckoutError` when the cart is empty, a product is gone or
    /// stock is short, and `RepositoryError` for database failures.
    #[tracing::instrument(skip(self, shipping, policy), fields(user_id = %user_id))]
    pub async fn place(
        &self,
        user_id: UserId,
        shipping: ShippingDetails,
        policy: &ShippingPolicy,
    ) -> Result<Order, PlaceOrderError> {
        let mut tx = self.pool.begin().await?;

        // A second checkout of the same cart waits here, then finds it empty.
        users::lock_shopper(&mut tx, user_id).await?;
        let lines = cart::load_lines(&mut tx, user_id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart.into());
        }
        let locked = products::lock_for_update(&mut tx, &product_ids(&lines)).await?;
        let plan = CheckoutPlan::build(&lines, &locked, shipping, policy)?;

        for decrement in &plan.decrements {
            let quantity = to_i32(decrement.quantity, "quantity")?;
            let result = sqlx::query(
                r"
                UPDATE shop.product
                SET stock = stock - $2, updated_at = NOW()
                WHERE id = $1 AND stock >= $2
                ",
            )
            .bind(decrement.product_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                let available = locked
                    .iter()
                    .find(|p| p.id == decrement.product_id)
                    .map_or(0, |p| p.stock);
                return Err(CheckoutError::InsufficientStock {
                    product_id: decrement.product_id,
                    requested: decrement.quantity,
                    available,
                }
                .into());
            }
        }

        let order_id = insert_order(&mut tx, user_id, &plan).await?;
        append_event(
            &mut tx,
            order_id,
            None,
            OrderStatus::Pending,
            Actor::Customer(user_id),
            None,
        )
        .await?;
        cart::clear(&mut tx, user_id).await?;

        let order = load_order(&mut tx, order_id, Some(user_id))
            .await?
            .ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            total = %order.total,
            items = order.item_count(),
            "Order placed"
        );
        Ok(order)
    }

    /// A page of the shopper's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        pagination: Pagination,
    ) -> Result<Page<OrderSummary>, RepositoryError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shop.customer_order WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(self.pool)
                .await?;

        let rows: Vec<OrderSummaryRow> = sqlx::query_as(
            r"
            SELECT o.id, o.user_id, o.status, o.total, o.created_at,
                   COALESCE((SELECT SUM(l.quantity) FROM shop.order_line l
                             WHERE l.order_id = o.id), 0)::BIGINT AS item_count
            FROM shop.customer_order o
            WHERE o.user_id = $1
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(user_id)
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

    /// One of the shopper's orders. Other shoppers' orders are not found.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_order(&mut conn, order_id, Some(user_id)).await
    }

    /// Cancel one of the shopper's pending orders and restock its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown or foreign order,
    /// `RepositoryError::Conflict` if a product cannot take its units back, and
    /// a `TransitionError` when the order is past `pending`.
    #[tracing::instrument(skip(self), fields(user_id = %user_id, order_id = %order_id))]
    pub async fn cancel_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Order, StatusChangeError> {
        let mut tx = self.pool.begin().await?;

        let from: OrderStatus = sqlx::query_scalar(
            "SELECT status FROM shop.customer_order WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let to = order::customer_cancel(from)?;
        stock::restock_order(&mut tx, order_id)
            .await
            .map_err(RepositoryError::from)?;
        set_status(&mut tx, order_id, to).await?;
        append_event(&mut tx, order_id, Some(from), to, Actor::Customer(user_id), None).await?;

        let order = load_order(&mut tx, order_id, Some(user_id))
            .await?
            .ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;

        tracing::info!(order_id = %order_id, "Order cancelled by customer");
        Ok(order)
    }
}

fn product_ids(lines: &[CartLine]) -> Vec<ProductId> {
    let mut ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

async fn insert_order(
    conn: &mut PgConnection,
    user_id: UserId,
    plan: &CheckoutPlan,
) -> Result<OrderId, RepositoryError> {
    let shipping = &plan.shipping;
    let order_id: OrderId = sqlx::query_scalar(
        r"
        INSERT INTO shop.customer_order
            (user_id, status, full_name, phone, address_line1, address_line2,
             city, postal_code, country, subtotal, shipping_fee, total)
        VALUES ($1, 'pending', $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id
        ",
    )
    .bind(user_id)
    .bind(&shipping.full_name)
    .bind(&shipping.phone)
    .bind(&shipping.address_line1)
    .bind(shipping.address_line2.as_deref())
    .bind(&shipping.city)
    .bind(&shipping.postal_code)
    .bind(&shipping.country)
    .bind(plan.subtotal.amount())
    .bind(plan.shipping_fee.amount())
    .bind(plan.total.amount())
    .fetch_one(&mut *conn)
    .await?;

    for line in &plan.lines {
        sqlx::query(
            r"
            INSERT INTO shop.order_line
                (order_id, product_id, product_name, size, unit_price, quantity, line_total)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.size.as_deref())
        .bind(line.unit_price.amount())
        .bind(to_i32(line.quantity, "quantity")?)
        .bind(line.line_total.amount())
        .execute(&mut *conn)
        .await?;
    }

    Ok(order_id)
}

/// Load an order with its lines, optionally scoped to one shopper.
async fn load_order(
    conn: &mut PgConnection,
    order_id: OrderId,
    user_id: Option<UserId>,
) -> Result<Option<Order>, RepositoryError> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM shop.customer_order \
         WHERE id = $1 AND ($2::INTEGER IS NULL OR user_id = $2)"
    ))
    .bind(order_id)
    .bind(user_id)
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

    row.into_order(lines).map(Some)
}

async fn set_status(
    conn: &mut PgConnection,
    order_id: OrderId,
    status: OrderStatus,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE shop.customer_order SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(order_id)
        .bind(status)
        .execute(conn)
        .await?;
    Ok(())
}

async fn append_event(
    conn: &mut PgConnection,
    order_id: OrderId,
    from: Option<OrderStatus>,
    to: OrderStatus,
    actor: Actor,
    note: Option<&str>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO shop.order_event (order_id, from_status, to_status, actor_kind, actor_id, note)
        VALUES ($1, $2, $3, $4, $5, $6)
        ",
    )
    .bind(order_id)
    .bind(from)
    .bind(to)
    .bind(actor.kind())
    .bind(actor.id())
    .bind(note)
    .execute(conn)
    .await?;
    Ok(())
}
