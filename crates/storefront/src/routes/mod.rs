//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog
//! GET  /products               - Product listing (filter, sort, paginate)
//! GET  /products/{slug}        - Product detail
//! GET  /categories             - Category list
//!
//! # Content
//! GET  /lookbook               - Published lookbook entries
//! GET  /quotes                 - Active quotes
//! GET  /quotes/random          - One random quote
//!
//! # Auth (rate limited)
//! POST /auth/register          - Create account and log in
//! POST /auth/login             - Log in
//! POST /auth/logout            - Log out
//! GET  /auth/me                - Current shopper
//!
//! # Cart (requires auth)
//! GET  /cart                   - Priced cart
//! POST /cart/add               - Add units
//! POST /cart/update            - Set quantity (0 removes)
//! POST /cart/remove            - Remove line
//! GET  /cart/count             - Units in cart
//!
//! # Checkout (requires auth)
//! POST /checkout               - Place order
//!
//! # Account (requires auth)
//! GET  /account/orders         - Order history
//! GET  /account/orders/{id}    - Order detail
//! POST /account/orders/{id}/cancel - Cancel a pending order
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod content;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
///
/// Login and registration share a per-IP limiter.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .merge(limited)
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{slug}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
        .route("/orders/{id}/cancel", post(account::cancel))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let shopper = Router::new()
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::checkout))
        .nest("/account", account_routes())
        .layer(api_rate_limiter());

    Router::new()
        .nest("/products", product_routes())
        .route("/categories", get(products::categories))
        .route("/lookbook", get(content::lookbook))
        .route("/quotes", get(content::quotes))
        .route("/quotes/random", get(content::random_quote))
        .nest("/auth", auth_routes())
        .merge(shopper)
}
