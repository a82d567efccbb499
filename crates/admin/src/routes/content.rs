//! Lookbook and quote management.
//!
//! Edits here are picked up by the storefront once its content cache expires.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use atelier_core::content::{LookbookDraft, LookbookEntry, Quote, QuoteDraft};
use atelier_core::{LookbookEntryId, QuoteId};

use crate::db::ContentRepository;
use crate::error::Result;
use crate::extract::{AppJson, AppPath};
use crate::middleware::{RequireAdminAuth, RequireEditor};
use crate::state::AppState;

// =============================================================================
// Lookbook
// =============================================================================

/// Every lookbook entry, unpublished ones included.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn lookbook(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
) -> Result<Json<Vec<LookbookEntry>>> {
    let entries = ContentRepository::new(state.pool()).lookbook().await?;
    Ok(Json(entries))
}

#[instrument(skip(state, admin, draft), fields(admin_id = %admin.id))]
pub async fn create_lookbook(
    State(state): State<AppState>,
    RequireEditor(admin): RequireEditor,
    AppJson(draft): AppJson<LookbookDraft>,
) -> Result<(StatusCode, Json<LookbookEntry>)> {
    let valid = draft.validate()?;
    let entry = ContentRepository::new(state.pool())
        .create_lookbook(&valid)
        .await?;
    tracing::info!(entry_id = %entry.id, "Lookbook entry created");
    Ok((StatusCode::CREATED, Json(entry)))
}

#[instrument(skip(state, admin, draft), fields(admin_id = %admin.id))]
pub async fn update_lookbook(
    State(state): State<AppState>,
    RequireEditor(admin): RequireEditor,
    AppPath(id): AppPath<LookbookEntryId>,
    AppJson(draft): AppJson<LookbookDraft>,
) -> Result<Json<LookbookEntry>> {
    let valid = draft.validate()?;
    let entry = ContentRepository::new(state.pool())
        .update_lookbook(id, &valid)
        .await?;
    Ok(Json(entry))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_lookbook(
    State(state): State<AppState>,
    RequireEditor(admin): RequireEditor,
    AppPath(id): AppPath<LookbookEntryId>,
) -> Result<StatusCode> {
    ContentRepository::new(state.pool())
        .delete_lookbook(id)
        .await?;
    tracing::info!(entry_id = %id, "Lookbook entry deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Quotes
// =============================================================================

/// Every quote, inactive ones included.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn quotes(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
) -> Result<Json<Vec<Quote>>> {
    let quotes = ContentRepository::new(state.pool()).quotes().await?;
    Ok(Json(quotes))
}

#[instrument(skip(state, admin, draft), fields(admin_id = %admin.id))]
pub async fn create_quote(
    State(state): State<AppState>,
    RequireEditor(admin): RequireEditor,
    AppJson(draft): AppJson<QuoteDraft>,
) -> Result<(StatusCode, Json<Quote>)> {
    let valid = draft.validate()?;
    let quote = ContentRepository::new(state.pool())
        .create_quote(&valid)
        .await?;
    tracing::info!(quote_id = %quote.id, "Quote created");
    Ok((StatusCode::CREATED, Json(quote)))
}

#[instrument(skip(state, admin, draft), fields(admin_id = %admin.id))]
pub async fn update_quote(
    State(state): State<AppState>,
    RequireEditor(admin): RequireEditor,
    AppPath(id): AppPath<QuoteId>,
    AppJson(draft): AppJson<QuoteDraft>,
) -> Result<Json<Quote>> {
    let valid = draft.validate()?;
    let quote = ContentRepository::new(state.pool())
        .update_quote(id, &valid)
        .await?;
    Ok(Json(quote))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_quote(
    State(state): State<AppState>,
    RequireEditor(admin): RequireEditor,
    AppPath(id): AppPath<QuoteId>,
) -> Result<StatusCode> {
    ContentRepository::new(state.pool()).delete_quote(id).await?;
    tracing::info!(quote_id = %id, "Quote deleted");
    Ok(StatusCode::NO_CONTENT)
}
