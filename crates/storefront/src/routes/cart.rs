//! Cart route handlers.
//!
//! Every response carries the freshly priced cart so clients never have to
//! refetch after a change.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use atelier_core::ProductId;
use atelier_core::cart::{CartKey, PricedCart};

use crate::db::CartRepository;
use crate::error::{Result, add_breadcrumb};
use crate::extract::AppJson;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub product_id: ProductId,
    pub size: Option<String>,
    /// Defaults to 1.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

/// Quantity change request body.
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub product_id: ProductId,
    pub size: Option<String>,
    pub quantity: u32,
}

/// Line removal request body.
#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    pub product_id: ProductId,
    pub size: Option<String>,
}

/// Cart badge count.
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

const fn default_quantity() -> u32 {
    1
}

/// Show the priced cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<PricedCart>> {
    let cart = CartRepository::new(state.pool()).priced(user.id).await?;
    Ok(Json(cart))
}

/// Add units of a product.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<AddRequest>,
) -> Result<Json<PricedCart>> {
    let repo = CartRepository::new(state.pool());
    repo.add(user.id, body.product_id, body.size.as_deref(), body.quantity)
        .await?;

    let product_id = body.product_id.to_string();
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", product_id.as_str())]),
    );
    Ok(Json(repo.priced(user.id).await?))
}

/// Change a line's quantity. Zero removes the line.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<UpdateRequest>,
) -> Result<Json<PricedCart>> {
    let repo = CartRepository::new(state.pool());
    let key = CartKey::new(body.product_id, body.size.as_deref());
    repo.set_quantity(user.id, &key, body.quantity).await?;
    Ok(Json(repo.priced(user.id).await?))
}

/// Remove a line.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<RemoveRequest>,
) -> Result<Json<PricedCart>> {
    let repo = CartRepository::new(state.pool());
    let key = CartKey::new(body.product_id, body.size.as_deref());
    repo.remove(user.id, &key).await?;
    Ok(Json(repo.priced(user.id).await?))
}

/// Total units in the cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn count(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CountResponse>> {
    let count = CartRepository::new(state.pool()).count(user.id).await?;
    Ok(Json(CountResponse { count }))
}
