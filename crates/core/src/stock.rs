//! Stock bounds and the order restock shared by both binaries.
//!
//! `shop.product.stock` is an `INTEGER` with a `CHECK (stock >= 0)`, so every
//! count lives in `0..=MAX_STOCK`. Arithmetic on it happens in `BIGINT` and is
//! range-checked before it is written back.

use thiserror::Error;

use crate::types::ProductId;

/// Largest stock count a product can hold.
pub const MAX_STOCK: u32 = 2_147_483_647;

/// Errors from returning a cancelled order's units to stock.
#[derive(Debug, Error)]
pub enum RestockError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// The product already holds so much stock that the returned units would
    /// not fit.
    #[error("restocking product {0} would exceed the maximum stock of {max}", max = MAX_STOCK)]
    Overflow(ProductId),
}

/// Return every unit of an order to its product's stock.
///
/// Runs as one guarded `UPDATE`. A product that would overflow is left
/// untouched and reported, and the caller must roll back its transaction so
/// the order's other products are not restocked either.
///
/// # Errors
///
/// Returns `RestockError::Overflow` when a product cannot take its units back,
/// or `RestockError::Database` if the query fails.
#[cfg(feature = "postgres")]
pub async fn restock_order(
    conn: &mut sqlx::PgConnection,
    order_id: crate::types::OrderId,
) -> Result<(), RestockError> {
    let overflowing: Option<ProductId> = sqlx::query_scalar(
        r"
        WITH returned AS (
            SELECT product_id, SUM(quantity)::BIGINT AS quantity
            FROM shop.order_line
            WHERE order_id = $1
            GROUP BY product_id
        ),
        restocked AS (
            UPDATE shop.product p
            SET stock = (p.stock::BIGINT + r.quantity)::INTEGER, updated_at = NOW()
            FROM returned r
            WHERE p.id = r.product_id AND p.stock::BIGINT + r.quantity <= $2
            RETURNING p.id
        )
        SELECT product_id FROM returned
        WHERE product_id NOT IN (SELECT id FROM restocked)
        ORDER BY product_id
        LIMIT 1
        ",
    )
    .bind(order_id)
    .bind(i64::from(MAX_STOCK))
    .fetch_optional(conn)
    .await?;

    match overflowing {
        Some(product_id) => Err(RestockError::Overflow(product_id)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_stock_matches_column() {
        assert_eq!(i64::from(MAX_STOCK), i64::from(i32::MAX));
    }

    #[test]
    fn test_overflow_names_product() {
        let err = RestockError::Overflow(ProductId::new(12));
        assert_eq!(
            err.to_string(),
            "restocking product 12 would exceed the maximum stock of 2147483647"
        );
    }
}
