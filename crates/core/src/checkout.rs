//! Checkout planning.
//!
//! [`CheckoutPlan::build`] turns the cart and the *locked* product rows into
//! everything the order insert needs: line snapshots, per-product stock
//! decrements, and totals. It performs no I/O; the caller holds the row locks
//! and applies the plan inside the same transaction.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::cart::CartLine;
use crate::catalog::Product;
use crate::order::OrderLine;
use crate::types::{Price, ProductId, ValidationError, bounded_text, optional_text};

/// Why a checkout cannot proceed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    /// The product was archived or deleted after it was carted.
    #[error("product {product_id} is no longer available")]
    Unavailable { product_id: ProductId },
    #[error("only {available} of product {product_id} left, cart holds {requested}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },
}

/// Where an order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub full_name: String,
    pub phone: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingDetails {
    const MAX_FIELD: usize = 200;

    /// Trim every field and check required ones are present.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for the first blank or over-long field.
    pub fn validate(&self) -> Result<Self, ValidationError> {
        let max = Self::MAX_FIELD;
        Ok(Self {
            full_name: bounded_text("full_name", &self.full_name, 1, max)?,
            phone: bounded_text("phone", &self.phone, 1, max)?,
            address_line1: bounded_text("address_line1", &self.address_line1, 1, max)?,
            address_line2: optional_text("address_line2", self.address_line2.as_deref(), max)?,
            city: bounded_text("city", &self.city, 1, max)?,
            postal_code: bounded_text("postal_code", &self.postal_code, 1, max)?,
            country: bounded_text("country", &self.country, 1, max)?,
        })
    }
}

/// Shipping charge rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    pub flat_fee: Price,
    /// Subtotal at or above which shipping is free.
    pub free_over: Price,
}

impl ShippingPolicy {
    /// Shipping fee for an order with `subtotal`.
    #[must_use]
    pub fn fee_for(&self, subtotal: Price) -> Price {
        if subtotal >= self.free_over {
            Price::zero()
        } else {
            self.flat_fee
        }
    }
}

/// Stock to take from one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDecrement {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A validated checkout, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    pub lines: Vec<OrderLine>,
    /// One entry per product, in ascending product id order.
    pub decrements: Vec<StockDecrement>,
    pub shipping: ShippingDetails,
    pub subtotal: Price,
    pub shipping_fee: Price,
    pub total: Price,
}

impl CheckoutPlan {
    /// Plan an order for `cart` against `products`.
    ///
    /// `products` must be the rows as locked by the caller; any cart product
    /// missing from it counts as unavailable.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] when the cart is empty, a product is gone or
    /// archived, or a product's summed quantity exceeds its stock.
    pub fn build(
        cart: &[CartLine],
        products: &[Product],
        shipping: ShippingDetails,
        policy: &ShippingPolicy,
    ) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let by_id: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();

        let mut wanted: BTreeMap<ProductId, u32> = BTreeMap::new();
        for line in cart {
            let entry = wanted.entry(line.product_id).or_default();
            *entry = entry.saturating_add(line.quantity);
        }

        let mut decrements = Vec::with_capacity(wanted.len());
        for (&product_id, &requested) in &wanted {
            let product = by_id
                .get(&product_id)
                .filter(|p| p.active)
                .ok_or(CheckoutError::Unavailable { product_id })?;
            if requested > product.stock {
                return Err(CheckoutError::InsufficientStock {
                    product_id,
                    requested,
                    available: product.stock,
                });
            }
            decrements.push(StockDecrement {
                product_id,
                quantity: requested,
            });
        }

        let lines: Vec<OrderLine> = cart
            .iter()
            .filter(|line| line.quantity > 0)
            .filter_map(|line| {
                let product = by_id.get(&line.product_id)?;
                Some(OrderLine {
                    product_id: product.id,
                    product_name: product.name.clone(),
                    size: line.size.clone(),
                    unit_price: product.price,
                    quantity: line.quantity,
                    line_total: product.price.times(line.quantity),
                })
            })
            .collect();
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let subtotal: Price = lines.iter().map(|l| l.line_total).sum();
        let shipping_fee = policy.fee_for(subtotal);
        Ok(Self {
            lines,
            decrements,
            shipping,
            subtotal,
            shipping_fee,
            total: subtotal + shipping_fee,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::tests::product;

    fn policy() -> ShippingPolicy {
        ShippingPolicy {
            flat_fee: Price::parse("10.00").unwrap(),
            free_over: Price::parse("100.00").unwrap(),
        }
    }

    fn line(id: i32, size: Option<&str>, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            size: size.map(str::to_owned),
            quantity,
        }
    }

    fn address() -> ShippingDetails {
        ShippingDetails {
            full_name: "Ada Lovelace".to_owned(),
            phone: "+44 20 7946 0000".to_owned(),
            address_line1: "12 St James's Square".to_owned(),
            address_line2: None,
            city: "London".to_owned(),
            postal_code: "SW1Y 4LB".to_owned(),
            country: "GB".to_owned(),
        }
    }

    #[test]
    fn test_plan_totals_and_decrements() {
        let products = vec![product(2, 5, &["S", "M"]), product(1, 3, &[])];
        let cart = vec![
            line(2, Some("S"), 1),
            line(1, None, 1),
            line(2, Some("M"), 2),
        ];
        let plan = CheckoutPlan::build(&cart, &products, address(), &policy()).unwrap();
        assert_eq!(plan.lines.len(), 3);
        assert_eq!(plan.subtotal, Price::parse("80.00").unwrap());
        assert_eq!(plan.shipping_fee, Price::parse("10.00").unwrap());
        assert_eq!(plan.total, Price::parse("90.00").unwrap());
        assert_eq!(
            plan.decrements,
            vec![
                StockDecrement {
                    product_id: ProductId::new(1),
                    quantity: 1
                },
                StockDecrement {
                    product_id: ProductId::new(2),
                    quantity: 3
                },
            ]
        );
    }

    #[test]
    fn test_free_shipping_threshold() {
        let products = vec![product(1, 10, &[])];
        let plan =
            CheckoutPlan::build(&[line(1, None, 5)], &products, address(), &policy()).unwrap();
        assert_eq!(plan.subtotal, Price::parse("100.00").unwrap());
        assert!(plan.shipping_fee.is_zero());
        assert_eq!(plan.total, plan.subtotal);
    }

    #[test]
    fn test_failures() {
        let mut products = vec![product(1, 2, &["S", "M"])];
        assert_eq!(
            CheckoutPlan::build(&[], &products, address(), &policy()),
            Err(CheckoutError::EmptyCart)
        );
        let cart = vec![line(1, Some("S"), 2), line(1, Some("M"), 1)];
        assert_eq!(
            CheckoutPlan::build(&cart, &products, address(), &policy()),
            Err(CheckoutError::InsufficientStock {
                product_id: ProductId::new(1),
                requested: 3,
                available: 2
            })
        );
        products[0].active = false;
        assert_eq!(
            CheckoutPlan::build(&cart[..1], &products, address(), &policy()),
            Err(CheckoutError::Unavailable {
                product_id: ProductId::new(1)
            })
        );
        assert_eq!(
            CheckoutPlan::build(&[line(9, None, 1)], &products, address(), &policy()),
            Err(CheckoutError::Unavailable {
                product_id: ProductId::new(9)
            })
        );
    }

    #[test]
    fn test_shipping_validation() {
        let mut details = address();
        details.address_line2 = Some("   ".to_owned());
        details.city = "  London ".to_owned();
        let valid = details.validate().unwrap();
        assert_eq!(valid.city, "London");
        assert_eq!(valid.address_line2, None);

        details.phone = String::new();
        assert_eq!(details.validate().unwrap_err().field, "phone");
        details.phone = "1".repeat(201);
        assert_eq!(details.validate().unwrap_err().field, "phone");
    }
}
