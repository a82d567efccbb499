//! Order workflow.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use atelier_core::catalog::{Page, Pagination};
use atelier_core::order::OrderSummary;
use atelier_core::{OrderId, OrderStatus, optional_text};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::{RequireAdminAuth, RequireEditor};
use crate::models::OrderDetail;
use crate::state::AppState;

const MAX_NOTE_LENGTH: usize = 500;

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Body of `POST /orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: OrderStatus,
    pub note: Option<String>,
}

/// Orders, newest first, optionally filtered by status.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    AppQuery(query): AppQuery<OrderListQuery>,
) -> Result<Json<Page<OrderSummary>>> {
    let pagination = Pagination::new(query.page, query.per_page);
    let page = OrderRepository::new(state.pool())
        .list(query.status, pagination)
        .await?;
    Ok(Json(page))
}

/// One order with lines, status history and the allowed next statuses.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    AppPath(order_id): AppPath<OrderId>,
) -> Result<Json<OrderDetail>> {
    OrderRepository::new(state.pool())
        .detail(order_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order not found".to_owned()))
}

/// Move an order to a new status. Cancelling restocks its lines.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, to = %body.status))]
pub async fn change_status(
    State(state): State<AppState>,
    RequireEditor(admin): RequireEditor,
    AppPath(order_id): AppPath<OrderId>,
    AppJson(body): AppJson<StatusChangeRequest>,
) -> Result<Json<OrderDetail>> {
    let note = optional_text("note", body.note.as_deref(), MAX_NOTE_LENGTH)?;
    let detail = OrderRepository::new(state.pool())
        .change_status(order_id, body.status, admin.id, note.as_deref())
        .await?;

    tracing::info!(order_id = %order_id, status = %detail.order.status, "Order status changed");
    Ok(Json(detail))
}
