//! Catalog route handlers.
//!
//! Listings are read straight from the database; only the category list is
//! cached.

use axum::{Json, extract::State};
use tracing::instrument;

use atelier_core::catalog::{CatalogQuery, Page, Product};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::extract::{AppPath, AppQuery};
use crate::state::AppState;

/// List active products with filtering, sorting and pagination.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    AppQuery(mut query): AppQuery<CatalogQuery>,
) -> Result<Json<Page<Product>>> {
    // Archived products are never visible to shoppers.
    query.include_inactive = false;
    let (filter, pagination) = query.validate()?;

    let page = ProductRepository::new(state.pool())
        .list(&filter, pagination)
        .await?;
    Ok(Json(page))
}

/// Show one active product by slug.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    AppPath(slug): AppPath<String>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get_active_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Product {slug} not found")))
}

/// Distinct categories of active products.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let categories = state.content().categories(state.pool()).await?;
    Ok(Json(categories.as_ref().clone()))
}
