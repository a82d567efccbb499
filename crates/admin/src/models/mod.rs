//! Domain models for admin.

pub mod admin_user;
pub mod inventory;
pub mod order;
pub mod session;

pub use admin_user::{AdminRole, AdminUser};
pub use inventory::{InventoryAdjustment, LowStockProduct};
pub use order::OrderDetail;
pub use session::{CurrentAdmin, keys as session_keys};
