//! Product catalog: the product record, its validated draft, and the
//! filter/sort/pagination rules for listing it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::stock::MAX_STOCK;
use crate::types::{
    ImageUrl, Price, ProductId, Slug, ValidationError, bounded_text,
};

/// A product as shown to shoppers and staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub slug: Slug,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Price,
    /// Units on hand. Never negative.
    pub stock: u32,
    /// Size labels the product is offered in. Empty for one-size items.
    pub sizes: Vec<String>,
    pub image_urls: Vec<ImageUrl>,
    /// Archived products are hidden from the storefront.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether `size` is a valid choice for this product.
    ///
    /// One-size products accept only `None`; sized products require one of
    /// their listed sizes.
    #[must_use]
    pub fn accepts_size(&self, size: Option<&str>) -> bool {
        match size {
            None => self.sizes.is_empty(),
            Some(s) => self.sizes.iter().any(|listed| listed == s),
        }
    }
}

/// Product input from the back-office, before validation. Unknown keys are
/// rejected so a misspelled field is never silently defaulted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductDraft {
    pub name: String,
    /// Explicit slug; derived from `name` when absent.
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

const fn default_true() -> bool {
    true
}

/// A product draft that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidProduct {
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub category: String,
    pub price: Price,
    pub stock: u32,
    pub sizes: Vec<String>,
    pub image_urls: Vec<ImageUrl>,
    pub active: bool,
}

impl ProductDraft {
    /// Maximum number of size labels per product.
    pub const MAX_SIZES: usize = 20;
    /// Maximum number of images per product.
    pub const MAX_IMAGES: usize = 12;

    /// Validate every field, returning the first problem found.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the offending field.
    pub fn validate(&self) -> Result<ValidProduct, ValidationError> {
        let name = bounded_text("name", &self.name, 1, 200)?;
        let slug = match self.slug.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => Slug::parse(s),
            _ => Slug::from_name(&name),
        }
        .map_err(|e| ValidationError::new("slug", e.to_string()))?;
        let description = bounded_text("description", &self.description, 0, 5000)?;
        let category = bounded_text("category", &self.category, 1, 80)?;
        let price =
            Price::new(self.price).map_err(|e| ValidationError::new("price", e.to_string()))?;
        let stock = u32::try_from(self.stock)
            .ok()
            .filter(|s| *s <= MAX_STOCK)
            .ok_or_else(|| {
                ValidationError::new("stock", format!("must be between 0 and {MAX_STOCK}"))
            })?;

        if self.sizes.len() > Self::MAX_SIZES {
            return Err(ValidationError::new(
                "sizes",
                format!("at most {} sizes", Self::MAX_SIZES),
            ));
        }
        let mut sizes: Vec<String> = Vec::with_capacity(self.sizes.len());
        for size in &self.sizes {
            let size = bounded_text("sizes", size, 1, 20)?;
            if sizes.contains(&size) {
                return Err(ValidationError::new(
                    "sizes",
                    format!("duplicate size {size}"),
                ));
            }
            sizes.push(size);
        }

        if self.image_urls.len() > Self::MAX_IMAGES {
            return Err(ValidationError::new(
                "image_urls",
                format!("at most {} images", Self::MAX_IMAGES),
            ));
        }
        let image_urls = self
            .image_urls
            .iter()
            .map(|u| ImageUrl::parse(u).map_err(|e| ValidationError::new("image_urls", e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ValidProduct {
            name,
            slug,
            description,
            category,
            price,
            stock,
            sizes,
            image_urls,
            active: self.active,
        })
    }
}

// =============================================================================
// Listing
// =============================================================================

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    NameAsc,
}

impl ProductSort {
    /// `ORDER BY` clause for this sort, with `id` as a stable tiebreaker.
    ///
    /// The returned fragment is a fixed string and safe to splice into SQL.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "created_at DESC, id DESC",
            Self::PriceAsc => "price ASC, id ASC",
            Self::PriceDesc => "price DESC, id DESC",
            Self::NameAsc => "lower(name) ASC, id ASC",
        }
    }
}

/// Raw listing parameters as they arrive in a query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Back-office only: include archived products.
    #[serde(default)]
    pub include_inactive: bool,
}

/// Validated listing filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogFilter {
    pub category: Option<String>,
    /// `ILIKE` pattern with user wildcards escaped, already wrapped in `%`.
    pub search_pattern: Option<String>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub in_stock: bool,
    pub include_inactive: bool,
    pub sort: ProductSort,
}

impl CatalogQuery {
    /// Validate the query into a filter and pagination window.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for negative or inverted price bounds.
    pub fn validate(&self) -> Result<(CatalogFilter, Pagination), ValidationError> {
        let price_bound = |field: &'static str, value: Option<Decimal>| {
            value
                .map(|v| Price::new(v).map_err(|e| ValidationError::new(field, e.to_string())))
                .transpose()
        };
        let min_price = price_bound("min_price", self.min_price)?;
        let max_price = price_bound("max_price", self.max_price)?;
        if let (Some(min), Some(max)) = (min_price, max_price)
            && min > max
        {
            return Err(ValidationError::new(
                "min_price",
                "must not exceed max_price",
            ));
        }

        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned);
        let search_pattern = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let filter = CatalogFilter {
            category,
            search_pattern,
            min_price,
            max_price,
            in_stock: self.in_stock,
            include_inactive: self.include_inactive,
            sort: self.sort,
        };
        Ok((filter, Pagination::new(self.page, self.per_page)))
    }
}

/// Escape `%`, `_` and `\` so user input matches literally under `LIKE`.
#[must_use]
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// A 1-based page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub const DEFAULT_PER_PAGE: u32 = 24;
    pub const MAX_PER_PAGE: u32 = 100;

    /// Build a window, defaulting and clamping out-of-range values.
    #[must_use]
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(Self::DEFAULT_PER_PAGE)
                .clamp(1, Self::MAX_PER_PAGE),
        }
    }

    /// SQL `LIMIT`.
    #[must_use]
    pub fn limit(self) -> i64 {
        i64::from(self.per_page)
    }

    /// SQL `OFFSET`.
    #[must_use]
    pub fn offset(self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
}

impl<T> Page<T> {
    /// Assemble a page from its items and the total number of matches.
    #[must_use]
    pub fn new(items: Vec<T>, pagination: Pagination, total: u64) -> Self {
        let per_page = u64::from(pagination.per_page);
        let total_pages = total.div_ceil(per_page);
        Self {
            items,
            page: pagination.page,
            per_page: pagination.per_page,
            total,
            total_pages,
            has_next: u64::from(pagination.page) < total_pages,
        }
    }
}
