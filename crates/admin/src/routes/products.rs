//! Product management.
//!
//! Edits never touch stock; stock moves through the inventory endpoints so
//! every change lands in the adjustment log.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::instrument;

use atelier_core::ProductId;
use atelier_core::catalog::{CatalogQuery, Page, Product, ProductDraft};

use crate::db::{InventoryRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::{RequireAdminAuth, RequireEditor};
use crate::models::InventoryAdjustment;
use crate::state::AppState;

/// Adjustments shown with a product.
const HISTORY_LIMIT: i64 = 50;

/// A product with its recent stock history.
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub history: Vec<InventoryAdjustment>,
}

/// List products, archived ones included on request.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    AppQuery(query): AppQuery<CatalogQuery>,
) -> Result<Json<Page<Product>>> {
    let (filter, pagination) = query.validate()?;
    let page = ProductRepository::new(state.pool())
        .list(&filter, pagination)
        .await?;
    Ok(Json(page))
}

/// Show one product with its stock history.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    AppPath(id): AppPath<ProductId>,
) -> Result<Json<ProductDetail>> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {id} not found")))?;
    let history = InventoryRepository::new(state.pool())
        .history(id, HISTORY_LIMIT)
        .await?;
    Ok(Json(ProductDetail { product, history }))
}

/// Create a product.
#[instrument(skip(state, admin, draft), fields(admin_id = %admin.id, name = %draft.name))]
pub async fn create(
    State(state): State<AppState>,
    RequireEditor(admin): RequireEditor,
    AppJson(draft): AppJson<ProductDraft>,
) -> Result<(StatusCode, Json<Product>)> {
    let valid = draft.validate()?;
    let product = ProductRepository::new(state.pool()).create(&valid).await?;

    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product's details. The `stock` field is ignored.
#[instrument(skip(state, admin, draft), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireEditor(admin): RequireEditor,
    AppPath(id): AppPath<ProductId>,
    AppJson(draft): AppJson<ProductDraft>,
) -> Result<Json<Product>> {
    let valid = draft.validate()?;
    let product = ProductRepository::new(state.pool())
        .update(id, &valid)
        .await?;

    tracing::info!(product_id = %product.id, "Product updated");
    Ok(Json(product))
}

/// Archive a product. Order history keeps its snapshot.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn archive(
    State(state): State<AppState>,
    RequireEditor(admin): RequireEditor,
    AppPath(id): AppPath<ProductId>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool()).archive(id).await?;

    tracing::info!(product_id = %product.id, "Product archived");
    Ok(Json(product))
}
