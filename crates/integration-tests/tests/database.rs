//! Database-backed tests for the invariants that live in SQL: no overselling
//! under concurrent checkout, no negative stock, restock on cancel.
//!
//! Run against a scratch database with
//! `DATABASE_URL=postgres://... cargo test -p atelier-integration-tests -- --ignored`.

#![allow(clippy::unwrap_used)]

use atelier_admin::db::RepositoryError;
use atelier_admin::db::inventory::StockChangeError;
use atelier_admin::db::orders::StatusChangeError;
use atelier_admin::services::auth::AdminAuthService;
use atelier_core::catalog::{Pagination, Product, ProductDraft};
use atelier_core::cart::CartError;
use atelier_core::checkout::{CheckoutError, ShippingDetails, ShippingPolicy};
use atelier_core::stock::MAX_STOCK;
use atelier_core::{AdminRole, AdminUserId, OrderStatus, Price, UserId};
use atelier_storefront::db::cart::CartUpdateError;
use atelier_storefront::db::RepositoryError as ShopperRepositoryError;
use atelier_storefront::db::orders::{
    PlaceOrderError, StatusChangeError as ShopperStatusChangeError,
};
use atelier_storefront::db::{CartRepository, OrderRepository};
use atelier_storefront::services::auth::AuthService;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&url).await.unwrap();
    sqlx::migrate!("../../migrations").run(&pool).await.unwrap();
    pool
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", &Uuid::new_v4().simple().to_string()[..12])
}

async fn shopper(pool: &PgPool) -> UserId {
    let email = format!("{}@example.com", unique("shopper"));
    AuthService::new(pool)
        .register(&email, "hunter2hunter2", None)
        .await
        .unwrap()
        .id
}

async fn staff(pool: &PgPool) -> AdminUserId {
    let email = format!("{}@example.com", unique("staff"));
    AdminAuthService::new(pool)
        .create_admin(&email, "Stock Keeper", AdminRole::Admin, "a long staff password")
        .await
        .unwrap()
        .id
}

async fn product(pool: &PgPool, stock: i64) -> Product {
    sized_product(pool, stock, &[]).await
}

async fn sized_product(pool: &PgPool, stock: i64, sizes: &[&str]) -> Product {
    let draft = ProductDraft {
        name: unique("Test Tee"),
        category: "tops".to_owned(),
        price: Decimal::new(4500, 2),
        stock,
        sizes: sizes.iter().map(|s| (*s).to_owned()).collect(),
        ..ProductDraft::default()
    };
    atelier_admin::db::ProductRepository::new(pool)
        .create(&draft.validate().unwrap())
        .await
        .unwrap()
}

async fn stock_of(pool: &PgPool, product: &Product) -> i32 {
    sqlx::query_scalar("SELECT stock FROM shop.product WHERE id = $1")
        .bind(product.id)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn shipping() -> ShippingDetails {
    ShippingDetails {
        full_name: "Grace Hopper".to_owned(),
        phone: "555-0100".to_owned(),
        address_line1: "1 Compiler Way".to_owned(),
        address_line2: None,
        city: "Arlington".to_owned(),
        postal_code: "22201".to_owned(),
        country: "US".to_owned(),
    }
}

fn policy() -> ShippingPolicy {
    ShippingPolicy {
        flat_fee: Price::parse("5.00").unwrap(),
        free_over: Price::parse("100.00").unwrap(),
    }
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL pointing at a scratch database"]
async fn test_concurrent_checkout_never_oversells() {
    let pool = pool().await;
    let last_one = product(&pool, 1).await;
    let alice = shopper(&pool).await;
    let bob = shopper(&pool).await;

    let carts = CartRepository::new(&pool);
    carts.add(alice, last_one.id, None, 1).await.unwrap();
    carts.add(bob, last_one.id, None, 1).await.unwrap();

    let orders = OrderRepository::new(&pool);
    let policy = policy();
    let (a, b) = tokio::join!(
        orders.place(alice, shipping(), &policy),
        orders.place(bob, shipping(), &policy),
    );

    let placed = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(placed, 1, "exactly one shopper gets the last unit");
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(
        loser,
        Err(PlaceOrderError::Checkout(CheckoutError::InsufficientStock { .. }))
    ));
    assert_eq!(stock_of(&pool, &last_one).await, 0);
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL pointing at a scratch database"]
async fn test_same_shopper_double_checkout_places_one_order() {
    let pool = pool().await;
    let tee = product(&pool, 5).await;
    let user = shopper(&pool).await;

    CartRepository::new(&pool)
        .add(user, tee.id, None, 2)
        .await
        .unwrap();

    let orders = OrderRepository::new(&pool);
    let policy = policy();
    let (a, b) = tokio::join!(
        orders.place(user, shipping(), &policy),
        orders.place(user, shipping(), &policy),
    );

    let placed = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(placed, 1, "one cart becomes one order");
    let second = if a.is_ok() { b } else { a };
    assert!(matches!(
        second,
        Err(PlaceOrderError::Checkout(CheckoutError::EmptyCart))
    ));
    assert_eq!(stock_of(&pool, &tee).await, 3);
    let history = orders
        .list_for_user(user, Pagination::new(None, None))
        .await
        .unwrap();
    assert_eq!(history.total, 1);
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL pointing at a scratch database"]
async fn test_concurrent_adds_across_sizes_respect_stock() {
    let pool = pool().await;
    let tee = sized_product(&pool, 3, &["S", "M"]).await;
    let user = shopper(&pool).await;
    let carts = CartRepository::new(&pool);

    let (small, medium) = tokio::join!(
        carts.add(user, tee.id, Some("S"), 2),
        carts.add(user, tee.id, Some("M"), 2),
    );

    let added = [&small, &medium].iter().filter(|r| r.is_ok()).count();
    assert_eq!(added, 1, "both lines together would exceed stock");
    let rejected = if small.is_ok() { medium } else { small };
    assert!(matches!(
        rejected,
        Err(CartUpdateError::Cart(CartError::ExceedsStock {
            requested: 4,
            available: 3
        }))
    ));
    let held: u32 = carts
        .lines(user)
        .await
        .unwrap()
        .iter()
        .map(|l| l.quantity)
        .sum();
    assert_eq!(held, 2);
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL pointing at a scratch database"]
async fn test_concurrent_adds_of_one_line_are_not_lost() {
    let pool = pool().await;
    let tee = product(&pool, 10).await;
    let user = shopper(&pool).await;
    let carts = CartRepository::new(&pool);

    let (a, b) = tokio::join!(
        carts.add(user, tee.id, None, 1),
        carts.add(user, tee.id, None, 1),
    );
    a.unwrap();
    b.unwrap();

    let lines = carts.lines(user).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 2);
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL pointing at a scratch database"]
async fn test_checkout_empties_cart_and_prices_order() {
    let pool = pool().await;
    let tee = product(&pool, 5).await;
    let user = shopper(&pool).await;

    CartRepository::new(&pool)
        .add(user, tee.id, None, 2)
        .await
        .unwrap();
    let order = OrderRepository::new(&pool)
        .place(user, shipping(), &policy())
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.subtotal, Price::parse("90.00").unwrap());
    assert_eq!(order.shipping_fee, Price::parse("5.00").unwrap());
    assert_eq!(order.total, Price::parse("95.00").unwrap());
    assert_eq!(stock_of(&pool, &tee).await, 3);
    assert_eq!(CartRepository::new(&pool).count(user).await.unwrap(), 0);

    let err = OrderRepository::new(&pool)
        .place(user, shipping(), &policy())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PlaceOrderError::Checkout(CheckoutError::EmptyCart)
    ));
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL pointing at a scratch database"]
async fn test_adjustment_cannot_take_stock_negative() {
    let pool = pool().await;
    let tee = product(&pool, 2).await;
    let admin = staff(&pool).await;
    let inventory = atelier_admin::db::InventoryRepository::new(&pool);

    let err = inventory
        .adjust(tee.id, admin, -3, "damaged")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StockChangeError::WouldGoNegative { stock: 2, delta: -3 }
    ));
    assert_eq!(stock_of(&pool, &tee).await, 2);

    let adjustment = inventory.adjust(tee.id, admin, -2, "damaged").await.unwrap();
    assert_eq!(adjustment.stock_after, 0);

    let adjustment = inventory
        .set_stock(tee.id, admin, 7, "stocktake")
        .await
        .unwrap();
    assert_eq!(adjustment.delta, 7);
    assert_eq!(inventory.history(tee.id, 10).await.unwrap().len(), 2);
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL pointing at a scratch database"]
async fn test_cancel_restocks_and_records_events() {
    let pool = pool().await;
    let tee = product(&pool, 4).await;
    let user = shopper(&pool).await;
    let admin = staff(&pool).await;

    CartRepository::new(&pool)
        .add(user, tee.id, None, 3)
        .await
        .unwrap();
    let order = OrderRepository::new(&pool)
        .place(user, shipping(), &policy())
        .await
        .unwrap();
    assert_eq!(stock_of(&pool, &tee).await, 1);

    let back_office = atelier_admin::db::OrderRepository::new(&pool);
    back_office
        .change_status(order.id, OrderStatus::Processing, admin, None)
        .await
        .unwrap();

    // Too late for the shopper.
    assert!(
        OrderRepository::new(&pool)
            .cancel_for_user(user, order.id)
            .await
            .is_err()
    );

    let detail = back_office
        .change_status(order.id, OrderStatus::Cancelled, admin, Some("customer called"))
        .await
        .unwrap();
    assert_eq!(detail.order.status, OrderStatus::Cancelled);
    assert_eq!(detail.events.len(), 3);
    assert!(detail.allowed_next.is_empty());
    assert_eq!(stock_of(&pool, &tee).await, 4);
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL pointing at a scratch database"]
async fn test_adjustment_past_the_column_limit_is_refused() {
    let pool = pool().await;
    let tee = product(&pool, 5).await;
    let admin = staff(&pool).await;
    let inventory = atelier_admin::db::InventoryRepository::new(&pool);

    let err = inventory
        .adjust(tee.id, admin, i32::MAX, "bulk receipt")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StockChangeError::WouldOverflow {
            stock: 5,
            delta: i32::MAX
        }
    ));
    assert_eq!(stock_of(&pool, &tee).await, 5);
    assert!(inventory.history(tee.id, 10).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "Requires DATABASE_URL pointing at a scratch database"]
async fn test_cancel_that_cannot_restock_changes_nothing() {
    let pool = pool().await;
    let tee = product(&pool, 4).await;
    let user = shopper(&pool).await;
    let admin = staff(&pool).await;

    CartRepository::new(&pool)
        .add(user, tee.id, None, 3)
        .await
        .unwrap();
    let order = OrderRepository::new(&pool)
        .place(user, shipping(), &policy())
        .await
        .unwrap();
    atelier_admin::db::InventoryRepository::new(&pool)
        .set_stock(tee.id, admin, MAX_STOCK - 1, "stocktake")
        .await
        .unwrap();

    let err = OrderRepository::new(&pool)
        .cancel_for_user(user, order.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ShopperStatusChangeError::Repository(ShopperRepositoryError::Conflict(_))
    ));

    let err = atelier_admin::db::OrderRepository::new(&pool)
        .change_status(order.id, OrderStatus::Cancelled, admin, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StatusChangeError::Repository(RepositoryError::Conflict(_))
    ));

    assert_eq!(stock_of(&pool, &tee).await, i32::MAX - 1);
    let order = OrderRepository::new(&pool)
        .get_for_user(user, order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
}
