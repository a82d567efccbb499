//! Seed the catalog and editorial content from a YAML file.
//!
//! Seeding is additive and safe to repeat: products are matched by slug,
//! lookbook entries by image URL and quotes by text, and existing rows are
//! left untouched. Everything is validated before the first write and
//! inserted in one transaction.
//!
//! ```yaml
//! products:
//!   - name: Linen Wrap Dress
//!     category: dresses
//!     price: "149.00"
//!     stock: 8
//!     sizes: [S, M, L]
//!     image_urls: ["https://cdn.example.com/wrap.jpg"]
//! lookbook:
//!   - title: Spring Edit
//!     image_url: https://cdn.example.com/spring.jpg
//!     position: 1
//! quotes:
//!   - text: Elegance is refusal.
//!     author: Coco Chanel
//! ```

use std::collections::HashSet;
use std::path::Path;

use atelier_core::{ImageUrl, ValidationError};
use atelier_core::catalog::{ProductDraft, ValidProduct};
use atelier_core::content::{LookbookDraft, QuoteDraft, ValidLookbookEntry, ValidQuote};
use secrecy::SecretString;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{section}[{index}]: {source}")]
    Invalid {
        section: &'static str,
        index: usize,
        source: ValidationError,
    },

    #[error("products[{index}]: duplicate slug {slug}")]
    DuplicateSlug { index: usize, slug: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Seed file contents, as written.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    #[serde(default)]
    pub products: Vec<ProductDraft>,
    #[serde(default)]
    pub lookbook: Vec<LookbookDraft>,
    #[serde(default)]
    pub quotes: Vec<QuoteDraft>,
}

/// A seed file whose every entry passed validation.
#[derive(Debug)]
pub struct ValidSeed {
    pub products: Vec<ValidProduct>,
    pub lookbook: Vec<ValidLookbookEntry>,
    pub quotes: Vec<ValidQuote>,
}

/// Rows inserted and skipped per section.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub products_inserted: u64,
    pub products_skipped: u64,
    pub lookbook_inserted: u64,
    pub lookbook_skipped: u64,
    pub quotes_inserted: u64,
    pub quotes_skipped: u64,
}

impl SeedFile {
    /// Parse a seed file from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Yaml` for malformed YAML or unknown sections or keys.
    pub fn parse(yaml: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Validate every entry, reporting the first problem with its position.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Invalid` or `SeedError::DuplicateSlug`.
    pub fn validate(&self) -> Result<ValidSeed, SeedError> {
        let mut slugs = HashSet::new();
        let mut products = Vec::with_capacity(self.products.len());
        for (index, draft) in self.products.iter().enumerate() {
            let product = draft.validate().map_err(invalid("products", index))?;
            if !slugs.insert(product.slug.as_str().to_owned()) {
                return Err(SeedError::DuplicateSlug {
                    index,
                    slug: product.slug.as_str().to_owned(),
                });
            }
            products.push(product);
        }

        let lookbook: Vec<ValidLookbookEntry> = self
            .lookbook
            .iter()
            .enumerate()
            .map(|(index, draft)| draft.validate().map_err(invalid("lookbook", index)))
            .collect::<Result<_, _>>()?;

        let quotes: Vec<ValidQuote> = self
            .quotes
            .iter()
            .enumerate()
            .map(|(index, draft)| draft.validate().map_err(invalid("quotes", index)))
            .collect::<Result<_, _>>()?;

        Ok(ValidSeed {
            products,
            lookbook,
            quotes,
        })
    }
}

fn invalid(section: &'static str, index: usize) -> impl FnOnce(ValidationError) -> SeedError {
    move |source| SeedError::Invalid {
        section,
        index,
        source,
    }
}

/// Read, validate and apply a seed file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or validated, or a write fails.
/// A failed write leaves the database unchanged.
pub async fn run(
    database_url: &SecretString,
    path: &Path,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(path = %path.display(), "Loading seed file");
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Read {
            path: path.display().to_string(),
            source,
        })?;

    let seed = SeedFile::parse(&content)?.validate()?;
    tracing::info!(
        products = seed.products.len(),
        lookbook = seed.lookbook.len(),
        quotes = seed.quotes.len(),
        "Seed file validated"
    );

    if dry_run {
        tracing::info!("Dry run, nothing written");
        return Ok(());
    }

    let pool = atelier_admin::db::create_pool(database_url).await?;
    let report = apply(&pool, &seed).await?;

    tracing::info!("Seeding complete!");
    tracing::info!(
        "  Products: {} inserted, {} already present",
        report.products_inserted,
        report.products_skipped
    );
    tracing::info!(
        "  Lookbook: {} inserted, {} already present",
        report.lookbook_inserted,
        report.lookbook_skipped
    );
    tracing::info!(
        "  Quotes:   {} inserted, {} already present",
        report.quotes_inserted,
        report.quotes_skipped
    );
    Ok(())
}

/// Insert whatever is missing, in one transaction.
///
/// # Errors
///
/// Returns `SeedError::Database` if any statement fails.
pub async fn apply(pool: &PgPool, seed: &ValidSeed) -> Result<SeedReport, SeedError> {
    let mut tx = pool.begin().await?;
    let mut report = SeedReport::default();

    for product in &seed.products {
        if insert_product(&mut tx, product).await? {
            report.products_inserted += 1;
        } else {
            report.products_skipped += 1;
        }
    }
    for entry in &seed.lookbook {
        if insert_lookbook_entry(&mut tx, entry).await? {
            report.lookbook_inserted += 1;
        } else {
            report.lookbook_skipped += 1;
        }
    }
    for quote in &seed.quotes {
        if insert_quote(&mut tx, quote).await? {
            report.quotes_inserted += 1;
        } else {
            report.quotes_skipped += 1;
        }
    }

    tx.commit().await?;
    Ok(report)
}

async fn insert_product(conn: &mut PgConnection, product: &ValidProduct) -> Result<bool, SeedError> {
    // Validation caps stock at i32::MAX
    let stock = i32::try_from(product.stock).unwrap_or(i32::MAX);
    let image_urls: Vec<&str> = product.image_urls.iter().map(ImageUrl::as_str).collect();

    let id: Option<i32> = sqlx::query_scalar(
        r"
        INSERT INTO shop.product
            (slug, name, description, category, price, stock, sizes, image_urls, active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (slug) DO NOTHING
        RETURNING id
        ",
    )
    .bind(product.slug.as_str())
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.category)
    .bind(product.price.amount())
    .bind(stock)
    .bind(&product.sizes)
    .bind(&image_urls)
    .bind(product.active)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(id.is_some())
}

async fn insert_lookbook_entry(
    conn: &mut PgConnection,
    entry: &ValidLookbookEntry,
) -> Result<bool, SeedError> {
    let result = sqlx::query(
        r"
        INSERT INTO shop.lookbook_entry (title, caption, image_url, position, published)
        SELECT $1, $2, $3, $4, $5
        WHERE NOT EXISTS (SELECT 1 FROM shop.lookbook_entry WHERE image_url = $3)
        ",
    )
    .bind(&entry.title)
    .bind(entry.caption.as_deref())
    .bind(entry.image_url.as_str())
    .bind(entry.position)
    .bind(entry.published)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

async fn insert_quote(conn: &mut PgConnection, quote: &ValidQuote) -> Result<bool, SeedError> {
    let result = sqlx::query(
        r"
        INSERT INTO shop.quote (text, author, active)
        SELECT $1, $2, $3
        WHERE NOT EXISTS (SELECT 1 FROM shop.quote WHERE text = $1)
        ",
    )
    .bind(&quote.text)
    .bind(quote.author.as_deref())
    .bind(quote.active)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../../../../seed/sample.yaml");

    #[test]
    fn test_sample_seed_is_valid() {
        let seed = SeedFile::parse(SAMPLE).unwrap().validate().unwrap();
        assert!(!seed.products.is_empty());
        assert!(!seed.lookbook.is_empty());
        assert!(!seed.quotes.is_empty());
    }

    #[test]
    fn test_sections_are_optional() {
        let seed = SeedFile::parse("quotes:\n  - text: Less, but better.\n")
            .unwrap()
            .validate()
            .unwrap();
        assert!(seed.products.is_empty());
        assert_eq!(seed.quotes.len(), 1);
        assert!(seed.quotes[0].active);
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(matches!(
            SeedFile::parse("customers: []\n"),
            Err(SeedError::Yaml(_))
        ));
    }

    #[test]
    fn test_misspelled_entry_key_rejected() {
        let yaml = r#"
products:
  - name: Wool Coat
    category: outerwear
    price: "320.00"
    stok: 8
"#;
        let err = SeedFile::parse(yaml).unwrap_err();
        assert!(matches!(err, SeedError::Yaml(_)));
        assert!(err.to_string().contains("stok"));

        let yaml = "quotes:\n  - text: Less, but better.\n    autor: Dieter Rams\n";
        assert!(matches!(SeedFile::parse(yaml), Err(SeedError::Yaml(_))));
    }

    #[test]
    fn test_invalid_entry_reports_position() {
        let yaml = r#"
products:
  - name: Silk Scarf
    category: accessories
    price: "45.00"
  - name: Broken
    category: accessories
    price: "-1"
"#;
        let err = SeedFile::parse(yaml).unwrap().validate().unwrap_err();
        match err {
            SeedError::Invalid {
                section, index, source,
            } => {
                assert_eq!(section, "products");
                assert_eq!(index, 1);
                assert_eq!(source.field, "price");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_slug_rejected() {
        let yaml = r#"
products:
  - name: Silk Scarf
    category: accessories
    price: "45.00"
  - name: Silk  Scarf
    slug: silk-scarf
    category: accessories
    price: "49.00"
"#;
        let err = SeedFile::parse(yaml).unwrap().validate().unwrap_err();
        assert!(matches!(err, SeedError::DuplicateSlug { index: 1, .. }));
    }
}
