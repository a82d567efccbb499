//! Lookbook and quote management.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use atelier_core::content::{LookbookEntry, Quote, ValidLookbookEntry, ValidQuote};
use atelier_core::{ImageUrl, LookbookEntryId, QuoteId};

use super::RepositoryError;

const LOOKBOOK_COLUMNS: &str = "id, title, caption, image_url, position, published, created_at";
const QUOTE_COLUMNS: &str = "id, text, author, active, created_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct LookbookRow {
    id: i32,
    title: String,
    caption: Option<String>,
    image_url: String,
    position: i32,
    published: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<LookbookRow> for LookbookEntry {
    type Error = RepositoryError;

    fn try_from(row: LookbookRow) -> Result<Self, Self::Error> {
        let image_url = ImageUrl::parse(&row.image_url).map_err(|e| {
            RepositoryError::DataCorruption(format!("lookbook entry {}: {e}", row.id))
        })?;
        Ok(Self {
            id: LookbookEntryId::new(row.id),
            title: row.title,
            caption: row.caption,
            image_url,
            position: row.position,
            published: row.published,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct QuoteRow {
    id: i32,
    text: String,
    author: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
}

impl From<QuoteRow> for Quote {
    fn from(row: QuoteRow) -> Self {
        Self {
            id: QuoteId::new(row.id),
            text: row.text,
            author: row.author,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for editorial content, drafts included.
pub struct ContentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContentRepository<'a> {
    /// Create a new content repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Lookbook
    // =========================================================================

    /// Every lookbook entry in display order, unpublished ones included.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lookbook(&self) -> Result<Vec<LookbookEntry>, RepositoryError> {
        let rows: Vec<LookbookRow> = sqlx::query_as(&format!(
            "SELECT {LOOKBOOK_COLUMNS} FROM shop.lookbook_entry ORDER BY position, id"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Add a lookbook entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_lookbook(
        &self,
        entry: &ValidLookbookEntry,
    ) -> Result<LookbookEntry, RepositoryError> {
        let row: LookbookRow = sqlx::query_as(&format!(
            r"
            INSERT INTO shop.lookbook_entry (title, caption, image_url, position, published)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {LOOKBOOK_COLUMNS}
            "
        ))
        .bind(&entry.title)
        .bind(entry.caption.as_deref())
        .bind(entry.image_url.as_str())
        .bind(entry.position)
        .bind(entry.published)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Replace a lookbook entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ID.
    pub async fn update_lookbook(
        &self,
        id: LookbookEntryId,
        entry: &ValidLookbookEntry,
    ) -> Result<LookbookEntry, RepositoryError> {
        let row: Option<LookbookRow> = sqlx::query_as(&format!(
            r"
            UPDATE shop.lookbook_entry
            SET title = $2, caption = $3, image_url = $4, position = $5, published = $6
            WHERE id = $1
            RETURNING {LOOKBOOK_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&entry.title)
        .bind(entry.caption.as_deref())
        .bind(entry.image_url.as_str())
        .bind(entry.position)
        .bind(entry.published)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Delete a lookbook entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ID.
    pub async fn delete_lookbook(&self, id: LookbookEntryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.lookbook_entry WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Quotes
    // =========================================================================

    /// Every quote, inactive ones included.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn quotes(&self) -> Result<Vec<Quote>, RepositoryError> {
        let rows: Vec<QuoteRow> =
            sqlx::query_as(&format!("SELECT {QUOTE_COLUMNS} FROM shop.quote ORDER BY id"))
                .fetch_all(self.pool)
                .await?;

        Ok(rows.into_iter().map(Quote::from).collect())
    }

    /// Add a quote.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_quote(&self, quote: &ValidQuote) -> Result<Quote, RepositoryError> {
        let row: QuoteRow = sqlx::query_as(&format!(
            "INSERT INTO shop.quote (text, author, active) VALUES ($1, $2, $3) RETURNING {QUOTE_COLUMNS}"
        ))
        .bind(&quote.text)
        .bind(quote.author.as_deref())
        .bind(quote.active)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Replace a quote.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ID.
    pub async fn update_quote(
        &self,
        id: QuoteId,
        quote: &ValidQuote,
    ) -> Result<Quote, RepositoryError> {
        let row: Option<QuoteRow> = sqlx::query_as(&format!(
            r"
            UPDATE shop.quote SET text = $2, author = $3, active = $4
            WHERE id = $1
            RETURNING {QUOTE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&quote.text)
        .bind(quote.author.as_deref())
        .bind(quote.active)
        .fetch_optional(self.pool)
        .await?;

        row.map(Quote::from).ok_or(RepositoryError::NotFound)
    }

    /// Delete a quote.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ID.
    pub async fn delete_quote(&self, id: QuoteId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.quote WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
