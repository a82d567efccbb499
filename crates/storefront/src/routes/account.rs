//! Shopper order history.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use atelier_core::OrderId;
use atelier_core::catalog::{Page, Pagination};
use atelier_core::order::{Order, OrderSummary};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::extract::{AppPath, AppQuery};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Pagination query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// The shopper's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<Page<OrderSummary>>> {
    let pagination = Pagination::new(query.page, query.per_page);
    let page = OrderRepository::new(state.pool())
        .list_for_user(user.id, pagination)
        .await?;
    Ok(Json(page))
}

/// One of the shopper's orders.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(order_id): AppPath<OrderId>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.pool())
        .get_for_user(user.id, order_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order not found".to_owned()))
}

/// Cancel a pending order.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(order_id): AppPath<OrderId>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .cancel_for_user(user.id, order_id)
        .await?;
    Ok(Json(order))
}
