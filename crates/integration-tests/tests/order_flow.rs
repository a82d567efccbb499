//! The order lifecycle end to end, in memory: cart, checkout plan, staff
//! workflow and the dashboard figures that follow from it.

#![allow(clippy::unwrap_used)]

use atelier_core::cart::{Cart, CartError, CartKey};
use atelier_core::catalog::Product;
use atelier_core::checkout::{CheckoutError, CheckoutPlan, ShippingDetails, ShippingPolicy};
use atelier_core::order::customer_cancel;
use atelier_core::sales::{SaleLine, SaleRecord, SalesSummary};
use atelier_core::{ImageUrl, OrderId, OrderStatus, Price, ProductId, Slug, TransitionError};
use chrono::{Duration, TimeZone, Utc};

fn price(s: &str) -> Price {
    Price::parse(s).unwrap()
}

fn product(id: i32, name: &str, unit: &str, stock: u32, sizes: &[&str]) -> Product {
    let now = Utc::now();
    Product {
        id: ProductId::new(id),
        slug: Slug::from_name(name).unwrap(),
        name: name.to_owned(),
        description: String::new(),
        category: "apparel".to_owned(),
        price: price(unit),
        stock,
        sizes: sizes.iter().map(|s| (*s).to_owned()).collect(),
        image_urls: vec![ImageUrl::parse("https://cdn.example.com/p.jpg").unwrap()],
        active: true,
        created_at: now,
        updated_at: now,
    }
}

fn shipping() -> ShippingDetails {
    ShippingDetails {
        full_name: "Ada Lovelace".to_owned(),
        phone: "+44 20 7946 0000".to_owned(),
        address_line1: "12 Analytical Row".to_owned(),
        address_line2: None,
        city: "London".to_owned(),
        postal_code: "N1 9GU".to_owned(),
        country: "GB".to_owned(),
    }
}

fn policy() -> ShippingPolicy {
    ShippingPolicy {
        flat_fee: price("8.00"),
        free_over: price("150.00"),
    }
}

#[test]
fn test_cart_to_checkout_plan() {
    let shirt = product(1, "Linen Shirt", "60.00", 3, &["S", "M"]);
    let tote = product(2, "Canvas Tote", "25.00", 10, &[]);

    let mut cart = Cart::default();
    cart.add(&shirt, Some("S"), 1).unwrap();
    cart.add(&shirt, Some("M"), 2).unwrap();
    cart.add(&tote, None, 1).unwrap();

    // Sizes of one product share its stock.
    let err = cart.add(&shirt, Some("S"), 1).unwrap_err();
    assert_eq!(
        err,
        CartError::ExceedsStock {
            requested: 4,
            available: 3
        }
    );
    assert_eq!(cart.total_quantity(), 4);

    let plan = CheckoutPlan::build(
        cart.lines(),
        &[shirt.clone(), tote.clone()],
        shipping(),
        &policy(),
    )
    .unwrap();

    assert_eq!(plan.lines.len(), 3);
    assert_eq!(plan.subtotal, price("205.00"));
    assert_eq!(plan.shipping_fee, Price::zero());
    assert_eq!(plan.total, price("205.00"));
    assert_eq!(plan.decrements.len(), 2);
    assert_eq!(plan.decrements[0].product_id, shirt.id);
    assert_eq!(plan.decrements[0].quantity, 3);
    assert_eq!(plan.decrements[1].quantity, 1);

    // Removing the shirts drops the order under the free-shipping line.
    cart.remove(&CartKey::new(shirt.id, Some("S")));
    cart.remove(&CartKey::new(shirt.id, Some("M")));
    let plan = CheckoutPlan::build(cart.lines(), &[tote], shipping(), &policy()).unwrap();
    assert_eq!(plan.shipping_fee, price("8.00"));
    assert_eq!(plan.total, price("33.00"));
}

#[test]
fn test_checkout_revalidates_against_locked_stock() {
    let mut shirt = product(1, "Linen Shirt", "60.00", 3, &["S"]);
    let mut cart = Cart::default();
    cart.add(&shirt, Some("S"), 3).unwrap();

    // Another shopper bought one in the meantime.
    shirt.stock = 2;
    let err = CheckoutPlan::build(cart.lines(), &[shirt.clone()], shipping(), &policy())
        .unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::InsufficientStock {
            requested: 3,
            available: 2,
            ..
        }
    ));

    shirt.active = false;
    let err = CheckoutPlan::build(cart.lines(), &[shirt], shipping(), &policy()).unwrap_err();
    assert!(matches!(err, CheckoutError::Unavailable { .. }));

    let err = CheckoutPlan::build(&[], &[], shipping(), &policy()).unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));
}

#[test]
fn test_staff_workflow() {
    let mut status = OrderStatus::Pending;
    for next in [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        assert!(!OrderStatus::restocks_on(next));
        status = status.transition(next).unwrap();
    }
    assert!(status.is_terminal());
    assert_eq!(
        status.transition(OrderStatus::Cancelled),
        Err(TransitionError::Terminal(OrderStatus::Delivered))
    );

    // Skipping a step is refused.
    assert!(matches!(
        OrderStatus::Pending.transition(OrderStatus::Shipped),
        Err(TransitionError::NotAllowed { .. })
    ));

    // Staff may cancel while processing; shoppers only while pending.
    assert_eq!(
        OrderStatus::Processing.transition(OrderStatus::Cancelled),
        Ok(OrderStatus::Cancelled)
    );
    assert!(OrderStatus::restocks_on(OrderStatus::Cancelled));
    assert_eq!(
        customer_cancel(OrderStatus::Pending),
        Ok(OrderStatus::Cancelled)
    );
    assert!(customer_cancel(OrderStatus::Processing).is_err());
}

#[test]
fn test_dashboard_ignores_cancelled_orders() {
    let since = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
    let until = since + Duration::days(3);

    let record = |id: i32, status: OrderStatus, hours: i64, qty: u32, total: &str| SaleRecord {
        order_id: OrderId::new(id),
        status,
        created_at: since + Duration::hours(hours),
        total: price(total),
        lines: vec![SaleLine {
            product_id: ProductId::new(1),
            product_name: "Linen Shirt".to_owned(),
            quantity: qty,
            line_total: price(total),
        }],
    };

    let records = vec![
        record(1, OrderStatus::Delivered, 2, 2, "120.00"),
        record(2, OrderStatus::Pending, 30, 1, "60.00"),
        record(3, OrderStatus::Cancelled, 31, 5, "300.00"),
        // Outside the window.
        record(4, OrderStatus::Delivered, 24 * 5, 1, "60.00"),
    ];

    let summary = SalesSummary::compute(&records, since, until, 5);
    assert_eq!(summary.order_count, 2);
    assert_eq!(summary.cancelled_count, 1);
    assert_eq!(summary.revenue, price("180.00"));
    assert_eq!(summary.units_sold, 3);
    assert_eq!(summary.average_order_value, price("90.00"));
    assert_eq!(summary.top_products.len(), 1);
    assert_eq!(summary.top_products[0].units, 3);
    assert!(summary.daily.len() >= 3);
    assert_eq!(summary.daily[0].revenue, price("120.00"));
    assert_eq!(summary.daily[1].orders, 1);
}
