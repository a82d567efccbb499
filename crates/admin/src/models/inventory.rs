//! Inventory views for the back-office.

use chrono::{DateTime, Utc};
use serde::Serialize;

use atelier_core::{AdminUserId, ProductId, Slug};

/// A stock change recorded against a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryAdjustment {
    pub id: i32,
    pub product_id: ProductId,
    pub admin_user_id: AdminUserId,
    /// Signed change applied to stock.
    pub delta: i32,
    pub stock_after: u32,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// An active product whose stock is at or below the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowStockProduct {
    pub id: ProductId,
    pub slug: Slug,
    pub name: String,
    pub category: String,
    pub stock: u32,
}
