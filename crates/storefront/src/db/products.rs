//! Product repository: catalog listing and row locks for cart and checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use atelier_core::catalog::{CatalogFilter, Page, Pagination, Product};
use atelier_core::{ImageUrl, Price, ProductId, Slug};

use super::{RepositoryError, to_u32};

pub(crate) const PRODUCT_COLUMNS: &str = "id, slug, name, description, category, price, stock, \
     sizes, image_urls, active, created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: i32,
    slug: String,
    name: String,
    description: String,
    category: String,
    price: Decimal,
    stock: i32,
    sizes: Vec<String>,
    image_urls: Vec<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!("product {}: invalid {what}: {e}", row.id))
        };
        let slug = Slug::parse(&row.slug).map_err(|e| corrupt("slug", &e))?;
        let price = Price::new(row.price).map_err(|e| corrupt("price", &e))?;
        let image_urls = row
            .image_urls
            .iter()
            .map(|u| ImageUrl::parse(u).map_err(|e| corrupt("image url", &e)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: ProductId::new(row.id),
            slug,
            name: row.name,
            description: row.description,
            category: row.category,
            price,
            stock: to_u32(row.stock, "stock")?,
            sizes: row.sizes,
            image_urls,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog reads.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching `filter`, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &CatalogFilter,
        pagination: Pagination,
    ) -> Result<Page<Product>, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM shop.product");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM shop.product"));
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY ")
            .push(filter.sort.order_by())
            .push(" LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());
        let rows: Vec<ProductRow> = query.build_query_as().fetch_all(self.pool).await?;

        let items = rows
            .into_iter()
            .map(Product::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(
            items,
            pagination,
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    /// Get an active product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE slug = $1 AND active"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Distinct categories of active products, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let categories = sqlx::query_scalar(
            "SELECT DISTINCT category FROM shop.product WHERE active ORDER BY category",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// Load products by ID, in any state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }
}

/// Append the `WHERE` clause for `filter`.
fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &CatalogFilter) {
    query.push(" WHERE TRUE");
    if !filter.include_inactive {
        query.push(" AND active");
    }
    if let Some(category) = &filter.category {
        query
            .push(" AND lower(category) = lower(")
            .push_bind(category.clone())
            .push(")");
    }
    if let Some(pattern) = &filter.search_pattern {
        query
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR category ILIKE ")
            .push_bind(pattern.clone())
            .push(")");
    }
    if let Some(min) = filter.min_price {
        query.push(" AND price >= ").push_bind(min.amount());
    }
    if let Some(max) = filter.max_price {
        query.push(" AND price <= ").push_bind(max.amount());
    }
    if filter.in_stock {
        query.push(" AND stock > 0");
    }
}

/// Lock one product row `FOR SHARE` inside the caller's transaction.
///
/// Concurrent cart updates may share the lock; checkout's `FOR UPDATE` waits
/// for them.
pub(crate) async fn lock_for_share(
    conn: &mut PgConnection,
    id: ProductId,
) -> Result<Option<Product>, RepositoryError> {
    let row: Option<ProductRow> = sqlx::query_as(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1 FOR SHARE"
    ))
    .bind(id.as_i32())
    .fetch_optional(conn)
    .await?;

    row.map(Product::try_from).transpose()
}

/// Lock product rows `FOR UPDATE` in ascending ID order.
///
/// Locking in a fixed order keeps two checkouts over the same products from
/// deadlocking.
pub(crate) async fn lock_for_update(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<Vec<Product>, RepositoryError> {
    let ids: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
    let rows: Vec<ProductRow> = sqlx::query_as(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    ))
    .bind(ids)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(Product::try_from).collect()
}
