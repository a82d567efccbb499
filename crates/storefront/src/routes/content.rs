//! Lookbook and quote route handlers. Both are served from the content cache.

use axum::{Json, extract::State};
use rand::seq::IndexedRandom;
use tracing::instrument;

use atelier_core::content::{LookbookEntry, Quote};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Published lookbook entries in display order.
#[instrument(skip(state))]
pub async fn lookbook(State(state): State<AppState>) -> Result<Json<Vec<LookbookEntry>>> {
    let entries = state.content().lookbook(state.pool()).await?;
    Ok(Json(entries.as_ref().clone()))
}

/// All active quotes.
#[instrument(skip(state))]
pub async fn quotes(State(state): State<AppState>) -> Result<Json<Vec<Quote>>> {
    let quotes = state.content().quotes(state.pool()).await?;
    Ok(Json(quotes.as_ref().clone()))
}

/// One active quote chosen at random.
#[instrument(skip(state))]
pub async fn random_quote(State(state): State<AppState>) -> Result<Json<Quote>> {
    let quotes = state.content().quotes(state.pool()).await?;
    quotes
        .choose(&mut rand::rng())
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No quotes available".to_owned()))
}
