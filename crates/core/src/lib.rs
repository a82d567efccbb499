//! Atelier Core - shared domain types and rules.
//!
//! This crate provides the types and business rules used by every Atelier
//! component:
//! - `storefront` - Public shopper API (catalog, cart, checkout, orders)
//! - `admin` - Back-office API (inventory, order workflow, content, dashboard)
//! - `cli` - Command-line tools for migrations, seeding and admin accounts
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP.
//! The binaries load rows, hand them to these rules, and write back whatever
//! the rules decide, inside their own transactions. The one exception is
//! [`stock::restock_order`], behind the `postgres` feature, which both
//! binaries run when an order is cancelled.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, slugs and statuses
//! - [`catalog`] - Products, listing filters, sorting and pagination
//! - [`cart`] - Cart lines and the per-product stock rule
//! - [`checkout`] - Shipping details and the checkout plan
//! - [`order`] - Orders, order lines and status history
//! - [`sales`] - Dashboard aggregation
//! - [`content`] - Lookbook entries and quotes
//! - [`stock`] - Stock bounds and order restocking

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod content;
pub mod order;
pub mod sales;
pub mod stock;
pub mod types;

pub use types::*;
