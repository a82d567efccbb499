//! Checkout route handler.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use atelier_core::checkout::ShippingDetails;
use atelier_core::order::Order;

use crate::db::OrderRepository;
use crate::error::Result;
use crate::extract::AppJson;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Checkout request body.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub shipping: ShippingDetails,
}

/// Place an order for everything in the cart.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let shipping = body.shipping.validate()?;
    let order = OrderRepository::new(state.pool())
        .place(user.id, shipping, &state.config().shipping)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}
