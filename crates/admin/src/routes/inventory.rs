//! Stock levels and adjustments.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use atelier_core::stock::MAX_STOCK;
use atelier_core::{ProductId, ValidationError, bounded_text, optional_text};

use crate::db::InventoryRepository;
use crate::error::Result;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::{RequireAdminAuth, RequireEditor};
use crate::models::{InventoryAdjustment, LowStockProduct};
use crate::state::AppState;

const MAX_REASON_LENGTH: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<u32>,
}

/// Body of `POST /inventory/{id}/adjust`.
#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub delta: i32,
    pub reason: String,
}

impl AdjustRequest {
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a zero or out-of-range delta, or a
    /// blank or long reason.
    pub fn validate(&self) -> std::result::Result<(i32, String), ValidationError> {
        if self.delta == 0 {
            return Err(ValidationError::new("delta", "must not be zero"));
        }
        if self.delta.unsigned_abs() > MAX_STOCK {
            return Err(ValidationError::new(
                "delta",
                format!("must be between -{MAX_STOCK} and {MAX_STOCK}"),
            ));
        }
        let reason = bounded_text("reason", &self.reason, 1, MAX_REASON_LENGTH)?;
        Ok((self.delta, reason))
    }
}

/// Body of `PUT /inventory/{id}`: a stocktake count.
#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub stock: i64,
    pub reason: Option<String>,
}

impl SetStockRequest {
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a negative or oversized count, or a
    /// long reason.
    pub fn validate(&self) -> std::result::Result<(u32, String), ValidationError> {
        let stock = u32::try_from(self.stock)
            .ok()
            .filter(|s| *s <= MAX_STOCK)
            .ok_or_else(|| {
                ValidationError::new("stock", format!("must be between 0 and {MAX_STOCK}"))
            })?;
        let reason = optional_text("reason", self.reason.as_deref(), MAX_REASON_LENGTH)?
            .unwrap_or_else(|| "stocktake".to_owned());
        Ok((stock, reason))
    }
}

/// Active products at or below the threshold, lowest stock first.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn low_stock(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    AppQuery(query): AppQuery<LowStockQuery>,
) -> Result<Json<Vec<LowStockProduct>>> {
    let threshold = query
        .threshold
        .unwrap_or(state.config().low_stock_threshold);
    let products = InventoryRepository::new(state.pool())
        .low_stock(threshold)
        .await?;
    Ok(Json(products))
}

/// Apply a signed stock change.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id, delta = body.delta))]
pub async fn adjust(
    State(state): State<AppState>,
    RequireEditor(admin): RequireEditor,
    AppPath(product_id): AppPath<ProductId>,
    AppJson(body): AppJson<AdjustRequest>,
) -> Result<Json<InventoryAdjustment>> {
    let (delta, reason) = body.validate()?;
    let adjustment = InventoryRepository::new(state.pool())
        .adjust(product_id, admin.id, delta, &reason)
        .await?;

    tracing::info!(
        product_id = %product_id,
        stock_after = adjustment.stock_after,
        "Stock adjusted"
    );
    Ok(Json(adjustment))
}

/// Overwrite stock with a counted value.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn set(
    State(state): State<AppState>,
    RequireEditor(admin): RequireEditor,
    AppPath(product_id): AppPath<ProductId>,
    AppJson(body): AppJson<SetStockRequest>,
) -> Result<Json<InventoryAdjustment>> {
    let (stock, reason) = body.validate()?;
    let adjustment = InventoryRepository::new(state.pool())
        .set_stock(product_id, admin.id, stock, &reason)
        .await?;

    tracing::info!(product_id = %product_id, stock, "Stock set");
    Ok(Json(adjustment))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_adjust_request() {
        let ok = AdjustRequest {
            delta: -3,
            reason: " damaged in transit ".to_owned(),
        };
        assert_eq!(ok.validate().unwrap(), (-3, "damaged in transit".to_owned()));

        let zero = AdjustRequest {
            delta: 0,
            reason: "noop".to_owned(),
        };
        assert_eq!(zero.validate().unwrap_err().field, "delta");

        let blank = AdjustRequest {
            delta: 2,
            reason: "  ".to_owned(),
        };
        assert_eq!(blank.validate().unwrap_err().field, "reason");

        let floor = AdjustRequest {
            delta: i32::MIN,
            reason: "write-off".to_owned(),
        };
        assert_eq!(floor.validate().unwrap_err().field, "delta");

        let body: std::result::Result<AdjustRequest, _> =
            serde_json::from_str(r#"{"delta": 3000000000, "reason": "restock"}"#);
        assert!(body.is_err());
    }

    #[test]
    fn test_set_stock_request() {
        let body: SetStockRequest = serde_json::from_str(r#"{"stock": 12}"#).unwrap();
        assert_eq!(body.validate().unwrap(), (12, "stocktake".to_owned()));

        let negative = SetStockRequest {
            stock: -1,
            reason: None,
        };
        assert_eq!(negative.validate().unwrap_err().field, "stock");

        let huge = SetStockRequest {
            stock: i64::from(u32::MAX),
            reason: None,
        };
        assert!(huge.validate().is_err());
    }
}
