//! Database operations for the storefront.
//!
//! # Schemas
//!
//! - `storefront.app_user` - Shopper accounts
//! - `storefront.session` - Tower-sessions storage
//! - `shop.product` - Catalog (read-only here, except stock at checkout)
//! - `shop.cart_item` - One row per (user, product, size)
//! - `shop.customer_order`, `shop.order_line`, `shop.order_event` - Orders
//! - `shop.lookbook_entry`, `shop.quote` - Editorial content
//!
//! # Migrations
//!
//! Migrations live in the workspace `migrations/` directory and run via:
//! ```bash
//! cargo run -p atelier-cli -- migrate
//! ```

pub mod cart;
pub mod content;
pub mod orders;
pub mod products;
pub mod users;

use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use atelier_core::Price;
use atelier_core::stock::RestockError;

pub use cart::CartRepository;
pub use content::ContentRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict`, anything else to `Database`.
    pub(crate) fn from_insert(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(e)
    }
}

impl From<RestockError> for RepositoryError {
    fn from(e: RestockError) -> Self {
        match e {
            RestockError::Database(e) => Self::Database(e),
            e @ RestockError::Overflow(_) => Self::Conflict(e.to_string()),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Convert a stored non-negative `INTEGER` into a `u32`.
pub(crate) fn to_u32(value: i32, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {column}: {value}")))
}

/// Convert a `u32` quantity into an `INTEGER` bind value.
pub(crate) fn to_i32(value: u32, column: &str) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("{column} out of range: {value}")))
}

/// Convert a stored `NUMERIC` amount into a `Price`.
pub(crate) fn to_price(value: Decimal, column: &str) -> Result<Price, RepositoryError> {
    Price::new(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {column} {value}: {e}")))
}
