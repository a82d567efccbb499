//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST   /auth/login               - Log in (rate limited)
//! POST   /auth/logout              - Log out
//! GET    /auth/me                  - Current staff member
//!
//! # Dashboard (viewer+)
//! GET    /dashboard?days=30        - Sales summary and low stock
//!
//! # Products (reads viewer+, writes admin)
//! GET    /products                 - Listing, `include_inactive` honoured
//! POST   /products                 - Create
//! GET    /products/{id}            - Detail with stock history
//! PUT    /products/{id}            - Update (stock untouched)
//! DELETE /products/{id}            - Archive
//!
//! # Inventory
//! GET    /inventory/low-stock      - Products at or below threshold
//! POST   /inventory/{id}/adjust    - Signed stock change
//! PUT    /inventory/{id}           - Set counted stock
//!
//! # Orders
//! GET    /orders                   - Listing, optional status filter
//! GET    /orders/{id}              - Detail with history
//! POST   /orders/{id}/status       - Status change
//!
//! # Content
//! GET|POST       /lookbook, GET|POST /quotes
//! PUT|DELETE     /lookbook/{id}, /quotes/{id}
//! ```
//!
//! Role checks live in the extractors each handler takes, so a handler
//! cannot forget them.

pub mod auth;
pub mod content;
pub mod dashboard;
pub mod inventory;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .merge(limited)
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::archive),
        )
}

/// Create the inventory routes router.
pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/low-stock", get(inventory::low_stock))
        .route("/{id}", put(inventory::set))
        .route("/{id}/adjust", post(inventory::adjust))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", post(orders::change_status))
}

/// Create the content routes router.
pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/lookbook",
            get(content::lookbook).post(content::create_lookbook),
        )
        .route(
            "/lookbook/{id}",
            put(content::update_lookbook).delete(content::delete_lookbook),
        )
        .route("/quotes", get(content::quotes).post(content::create_quote))
        .route(
            "/quotes/{id}",
            put(content::update_quote).delete(content::delete_quote),
        )
}

/// Create all routes for admin.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .route("/dashboard", get(dashboard::show))
        .nest("/products", product_routes())
        .nest("/inventory", inventory_routes())
        .nest("/orders", order_routes())
        .merge(content_routes())
}
