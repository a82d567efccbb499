//! Sales dashboard.

use axum::{Json, extract::State};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use atelier_core::ValidationError;
use atelier_core::sales::SalesSummary;

use crate::db::{InventoryRepository, SalesRepository};
use crate::error::Result;
use crate::extract::AppQuery;
use crate::middleware::RequireAdminAuth;
use crate::models::LowStockProduct;
use crate::state::AppState;

/// Default window length in days.
pub const DEFAULT_DAYS: u32 = 30;

/// Longest window the dashboard will aggregate.
pub const MAX_DAYS: u32 = 365;

const TOP_PRODUCTS: usize = 5;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub days: Option<u32>,
}

impl DashboardQuery {
    /// Window length, defaulting to 30 days.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] outside `1..=365`.
    pub fn days(&self) -> std::result::Result<u32, ValidationError> {
        match self.days {
            None => Ok(DEFAULT_DAYS),
            Some(d) if (1..=MAX_DAYS).contains(&d) => Ok(d),
            Some(_) => Err(ValidationError::new(
                "days",
                format!("must be between 1 and {MAX_DAYS}"),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    #[serde(flatten)]
    pub sales: SalesSummary,
    pub low_stock: Vec<LowStockProduct>,
    pub low_stock_threshold: u32,
}

/// Sales over the last `days` days plus products running low.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    AppQuery(query): AppQuery<DashboardQuery>,
) -> Result<Json<Dashboard>> {
    let days = query.days()?;
    let until = Utc::now();
    let since = until - Duration::days(i64::from(days));

    let records = SalesRepository::new(state.pool())
        .records(since, until)
        .await?;
    let sales = SalesSummary::compute(&records, since, until, TOP_PRODUCTS);

    let threshold = state.config().low_stock_threshold;
    let low_stock = InventoryRepository::new(state.pool())
        .low_stock(threshold)
        .await?;

    Ok(Json(Dashboard {
        sales,
        low_stock,
        low_stock_threshold: threshold,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_days_window() {
        assert_eq!(DashboardQuery { days: None }.days().unwrap(), 30);
        assert_eq!(DashboardQuery { days: Some(1) }.days().unwrap(), 1);
        assert_eq!(DashboardQuery { days: Some(365) }.days().unwrap(), 365);
        assert_eq!(
            DashboardQuery { days: Some(0) }.days().unwrap_err().field,
            "days"
        );
        assert!(DashboardQuery { days: Some(366) }.days().is_err());
    }
}
