//! In-process cache for slow-changing content.
//!
//! Categories, the published lookbook and active quotes are cached with
//! `moka` for 5 minutes. Product listings are never cached so stock is
//! always fresh.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use atelier_core::content::{LookbookEntry, Quote};

use crate::db::{ContentRepository, ProductRepository, RepositoryError};

/// Cache key for storefront content.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum CacheKey {
    Categories,
    Lookbook,
    Quotes,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Categories(Arc<Vec<String>>),
    Lookbook(Arc<Vec<LookbookEntry>>),
    Quotes(Arc<Vec<Quote>>),
}

/// Read-through cache over the content tables.
#[derive(Clone)]
pub struct ContentCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl ContentCache {
    /// Default time-to-live for cached entries.
    pub const TTL: Duration = Duration::from_secs(300);

    /// Create a cache with the default 5 minute TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(Self::TTL)
    }

    /// Create a cache with a custom TTL.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(16).time_to_live(ttl).build();
        Self { cache }
    }

    /// Distinct categories of active products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the cache is cold and the query fails.
    pub async fn categories(&self, pool: &PgPool) -> Result<Arc<Vec<String>>, RepositoryError> {
        if let Some(CacheValue::Categories(categories)) = self.cache.get(&CacheKey::Categories).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories = Arc::new(ProductRepository::new(pool).categories().await?);
        self.cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::clone(&categories)),
            )
            .await;
        Ok(categories)
    }

    /// Published lookbook entries in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the cache is cold and the query fails.
    pub async fn lookbook(
        &self,
        pool: &PgPool,
    ) -> Result<Arc<Vec<LookbookEntry>>, RepositoryError> {
        if let Some(CacheValue::Lookbook(entries)) = self.cache.get(&CacheKey::Lookbook).await {
            debug!("Cache hit for lookbook");
            return Ok(entries);
        }

        let entries = Arc::new(ContentRepository::new(pool).published_lookbook().await?);
        self.cache
            .insert(CacheKey::Lookbook, CacheValue::Lookbook(Arc::clone(&entries)))
            .await;
        Ok(entries)
    }

    /// Active quotes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the cache is cold and the query fails.
    pub async fn quotes(&self, pool: &PgPool) -> Result<Arc<Vec<Quote>>, RepositoryError> {
        if let Some(CacheValue::Quotes(quotes)) = self.cache.get(&CacheKey::Quotes).await {
            debug!("Cache hit for quotes");
            return Ok(quotes);
        }

        let quotes = Arc::new(ContentRepository::new(pool).active_quotes().await?);
        self.cache
            .insert(CacheKey::Quotes, CacheValue::Quotes(Arc::clone(&quotes)))
            .await;
        Ok(quotes)
    }

    /// Drop every cached entry.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new()
    }
}
