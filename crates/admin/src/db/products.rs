//! Product repository: catalog management for staff.
//!
//! Products are never deleted; archiving clears `active` so order lines keep
//! pointing at a real row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use atelier_core::catalog::{CatalogFilter, Page, Pagination, Product, ValidProduct};
use atelier_core::{ImageUrl, ProductId, Slug};

use super::{RepositoryError, to_i32, to_price, to_u32};

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
        let slug = Slug::parse(&row.slug).map_err(|e| {
            RepositoryError::DataCorruption(format!("product {}: invalid slug: {e}", row.id))
        })?;
        let image_urls = row
            .image_urls
            .iter()
            .map(|u| {
                ImageUrl::parse(u).map_err(|e| {
                    RepositoryError::DataCorruption(format!("product {}: invalid image: {e}", row.id))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: ProductId::new(row.id),
            slug,
            name: row.name,
            description: row.description,
            category: row.category,
            price: to_price(row.price, "price")?,
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

/// Repository for catalog management.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching `filter`, archived ones included when asked.
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

    /// Get a product by ID, archived or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Create a product with its opening stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, product: &ValidProduct) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(&format!(
            r"
            INSERT INTO shop.product
                (slug, name, description, category, price, stock, sizes, image_urls, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(product.slug.as_str())
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price.amount())
        .bind(to_i32(product.stock, "stock")?)
        .bind(&product.sizes)
        .bind(image_strings(product))
        .bind(product.active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "slug"))?;

        row.try_into()
    }

    /// Replace a product's descriptive fields.
    ///
    /// Stock is left alone: it only changes through the inventory endpoints,
    /// which keep an audit trail.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ID and
    /// `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        product: &ValidProduct,
    ) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            UPDATE shop.product
            SET slug = $2, name = $3, description = $4, category = $5, price = $6,
                sizes = $7, image_urls = $8, active = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(product.slug.as_str())
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price.amount())
        .bind(&product.sizes)
        .bind(image_strings(product))
        .bind(product.active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "slug"))?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Archive a product so it disappears from the storefront.
    ///
    /// Archiving twice is not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ID.
    pub async fn archive(&self, id: ProductId) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            UPDATE shop.product
            SET active = FALSE, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }
}

fn image_strings(product: &ValidProduct) -> Vec<String> {
    product
        .image_urls
        .iter()
        .map(|u| u.as_str().to_owned())
        .collect()
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
            .push(" OR slug ILIKE ")
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use atelier_core::catalog::ProductSort;

    use super::*;

    fn row() -> ProductRow {
        ProductRow {
            id: 4,
            slug: "linen-shirt".to_owned(),
            name: "Linen Shirt".to_owned(),
            description: String::new(),
            category: "Tops".to_owned(),
            price: Decimal::new(4500, 2),
            stock: 3,
            sizes: vec!["S".to_owned(), "M".to_owned()],
            image_urls: vec!["https://cdn.example.com/shirt.jpg".to_owned()],
            active: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_conversion_keeps_archived_flag() {
        let product = Product::try_from(row()).unwrap();
        assert!(!product.active);
        assert_eq!(product.stock, 3);
        assert_eq!(product.slug.as_str(), "linen-shirt");
    }

    #[test]
    fn test_negative_stock_is_corruption() {
        let mut bad = row();
        bad.stock = -1;
        assert!(matches!(
            Product::try_from(bad),
            Err(RepositoryError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_filters_sql() {
        let filter = CatalogFilter {
            category: Some("Tops".to_owned()),
            in_stock: true,
            include_inactive: true,
            sort: ProductSort::NameAsc,
            ..CatalogFilter::default()
        };
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM shop.product");
        push_filters(&mut query, &filter);
        let sql = query.sql();
        assert!(!sql.contains(" AND active"));
        assert!(sql.contains("lower(category) = lower($1)"));
        assert!(sql.ends_with(" AND stock > 0"));
    }
}
