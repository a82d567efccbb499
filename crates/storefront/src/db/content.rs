//! Lookbook and quote reads.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use atelier_core::content::{LookbookEntry, Quote};
use atelier_core::{ImageUrl, LookbookEntryId, QuoteId};

use super::RepositoryError;

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

/// Repository for published editorial content.
pub struct ContentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContentRepository<'a> {
    /// Create a new content repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Published lookbook entries in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn published_lookbook(&self) -> Result<Vec<LookbookEntry>, RepositoryError> {
        let rows: Vec<LookbookRow> = sqlx::query_as(
            r"
            SELECT id, title, caption, image_url, position, published, created_at
            FROM shop.lookbook_entry
            WHERE published
            ORDER BY position, id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Active quotes, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_quotes(&self) -> Result<Vec<Quote>, RepositoryError> {
        let rows: Vec<QuoteRow> = sqlx::query_as(
            "SELECT id, text, author, active, created_at FROM shop.quote WHERE active ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Quote::from).collect())
    }
}
