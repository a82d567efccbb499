//! Shopping cart rules.
//!
//! The cart is a set of lines keyed by `(product, size)`. Every mutation is
//! checked against the product as it exists at that moment, so the quantity
//! held for a product across all its sizes never exceeds its stock.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{ImageUrl, Price, ProductId, Slug};

/// A rejected cart mutation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Quantities start at one.
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    /// The product is archived.
    #[error("product {0} is not available")]
    Inactive(ProductId),
    /// The product comes in sizes and none was chosen.
    #[error("a size must be chosen for this product")]
    SizeRequired,
    /// The product does not come in the requested size.
    #[error("size {0} is not offered for this product")]
    UnknownSize(String),
    /// A size was given for a one-size product.
    #[error("this product does not come in sizes")]
    SizeNotApplicable,
    /// The product has fewer units than the cart would hold.
    #[error("only {available} in stock, cart would hold {requested}")]
    ExceedsStock {
        /// Units of this product the cart would hold after the change.
        requested: u32,
        /// Units on hand.
        available: u32,
    },
    /// The line being changed is not in the cart.
    #[error("item is not in the cart")]
    NotInCart,
    /// The product passed in does not match the line being changed.
    #[error("product mismatch")]
    ProductMismatch,
}

impl CartError {
    /// Whether this is a stock conflict rather than bad input.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::ExceedsStock { .. })
    }
}

/// Identity of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartKey {
    pub product_id: ProductId,
    #[serde(default)]
    pub size: Option<String>,
}

impl CartKey {
    /// Key for `product_id` in `size`, treating a blank size as none.
    #[must_use]
    pub fn new(product_id: ProductId, size: Option<&str>) -> Self {
        Self {
            product_id,
            size: size
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
        }
    }
}

/// One product/size pair in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub size: Option<String>,
    pub quantity: u32,
}

impl CartLine {
    fn matches(&self, key: &CartKey) -> bool {
        self.product_id == key.product_id && self.size == key.size
    }
}

/// A shopper's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Build a cart from stored lines.
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    /// All lines, in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The line stored under `key`, if any.
    #[must_use]
    pub fn line(&self, key: &CartKey) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.matches(key))
    }

    /// Units across every line.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
    }

    /// Units of `product_id` held by lines other than `except`.
    fn held_elsewhere(&self, product_id: ProductId, except: &CartKey) -> u32 {
        self.lines
            .iter()
            .filter(|l| l.product_id == product_id && !l.matches(except))
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
    }

    /// Add `quantity` units of `product` in `size`, merging with an existing
    /// line for the same key. Returns the line as it now stands.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] when the product is inactive, the size does not
    /// fit the product, the quantity is zero, or the product's total in the
    /// cart would exceed its stock. The cart is unchanged on error.
    pub fn add(
        &mut self,
        product: &Product,
        size: Option<&str>,
        quantity: u32,
    ) -> Result<CartLine, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        let key = check_product(product, size)?;
        let current = self.line(&key).map_or(0, |l| l.quantity);
        let new_quantity = current.saturating_add(quantity);
        self.check_stock(product, &key, new_quantity)?;
        Ok(self.put(key, new_quantity))
    }

    /// Replace the quantity of an existing line. Zero removes the line and
    /// returns `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if there is no such line, or the stock
    /// and availability errors of [`Cart::add`].
    pub fn set_quantity(
        &mut self,
        key: &CartKey,
        quantity: u32,
        product: &Product,
    ) -> Result<Option<CartLine>, CartError> {
        if product.id != key.product_id {
            return Err(CartError::ProductMismatch);
        }
        if self.line(key).is_none() {
            return Err(CartError::NotInCart);
        }
        if quantity == 0 {
            self.remove(key);
            return Ok(None);
        }
        if !product.active {
            return Err(CartError::Inactive(product.id));
        }
        self.check_stock(product, key, quantity)?;
        Ok(Some(self.put(key.clone(), quantity)))
    }

    /// Remove a line, returning it.
    pub fn remove(&mut self, key: &CartKey) -> Option<CartLine> {
        let index = self.lines.iter().position(|l| l.matches(key))?;
        Some(self.lines.remove(index))
    }

    fn check_stock(&self, product: &Product, key: &CartKey, quantity: u32) -> Result<(), CartError> {
        let requested = self
            .held_elsewhere(product.id, key)
            .saturating_add(quantity);
        if requested > product.stock {
            return Err(CartError::ExceedsStock {
                requested,
                available: product.stock,
            });
        }
        Ok(())
    }

    fn put(&mut self, key: CartKey, quantity: u32) -> CartLine {
        if let Some(line) = self.lines.iter_mut().find(|l| l.matches(&key)) {
            line.quantity = quantity;
            return line.clone();
        }
        let line = CartLine {
            product_id: key.product_id,
            size: key.size,
            quantity,
        };
        self.lines.push(line.clone());
        line
    }
}

/// Check that `product` can be carted in `size`, returning the line key.
fn check_product(product: &Product, size: Option<&str>) -> Result<CartKey, CartError> {
    if !product.active {
        return Err(CartError::Inactive(product.id));
    }
    let key = CartKey::new(product.id, size);
    match key.size.as_deref() {
        None if !product.sizes.is_empty() => Err(CartError::SizeRequired),
        Some(_) if product.sizes.is_empty() => Err(CartError::SizeNotApplicable),
        Some(s) if !product.accepts_size(Some(s)) => Err(CartError::UnknownSize(s.to_owned())),
        _ => Ok(key),
    }
}

// =============================================================================
// Priced view
// =============================================================================

/// A cart line joined with the product's current name and price.
#[derive(Debug, Clone, Serialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub slug: Slug,
    pub name: String,
    pub size: Option<String>,
    pub unit_price: Price,
    pub quantity: u32,
    pub line_total: Price,
    pub image_url: Option<ImageUrl>,
    /// False when the product was archived or its stock dropped below the
    /// quantity held since the line was added.
    pub available: bool,
}

/// The cart as shown to the shopper.
#[derive(Debug, Clone, Serialize)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub total_quantity: u32,
    pub subtotal: Price,
}

impl PricedCart {
    /// Price `lines` against `products`. Lines whose product is missing are
    /// dropped.
    #[must_use]
    pub fn new(lines: &[CartLine], products: &[Product]) -> Self {
        let by_id: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();
        let mut held: HashMap<ProductId, u32> = HashMap::new();
        for line in lines {
            let entry = held.entry(line.product_id).or_default();
            *entry = entry.saturating_add(line.quantity);
        }

        let lines: Vec<PricedLine> = lines
            .iter()
            .filter_map(|line| {
                let product = by_id.get(&line.product_id)?;
                let total_held = held.get(&line.product_id).copied().unwrap_or(0);
                Some(PricedLine {
                    product_id: product.id,
                    slug: product.slug.clone(),
                    name: product.name.clone(),
                    size: line.size.clone(),
                    unit_price: product.price,
                    quantity: line.quantity,
                    line_total: product.price.times(line.quantity),
                    image_url: product.image_urls.first().cloned(),
                    available: product.active && total_held <= product.stock,
                })
            })
            .collect();

        Self {
            total_quantity: lines
                .iter()
                .fold(0u32, |acc, l| acc.saturating_add(l.quantity)),
            subtotal: lines.iter().map(|l| l.line_total).sum(),
            lines,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use chrono::Utc;

    use super::*;

    pub(crate) fn product(id: i32, stock: u32, sizes: &[&str]) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            slug: Slug::parse(&format!("product-{id}")).unwrap(),
            name: format!("Product {id}"),
            description: String::new(),
            category: "Tops".to_owned(),
            price: Price::parse("20.00").unwrap(),
            stock,
            sizes: sizes.iter().map(|s| (*s).to_owned()).collect(),
            image_urls: Vec::new(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_add_merges_same_key() {
        let tee = product(1, 10, &["S", "M"]);
        let mut cart = Cart::default();
        cart.add(&tee, Some("M"), 2).unwrap();
        let line = cart.add(&tee, Some("M"), 3).unwrap();
        assert_eq!(line.quantity, 5);
        assert_eq!(cart.lines().len(), 1);
        cart.add(&tee, Some("S"), 1).unwrap();
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.total_quantity(), 6);
    }

    #[test]
    fn test_stock_is_shared_across_sizes() {
        let tee = product(1, 4, &["S", "M"]);
        let mut cart = Cart::default();
        cart.add(&tee, Some("S"), 3).unwrap();
        let err = cart.add(&tee, Some("M"), 2).unwrap_err();
        assert_eq!(
            err,
            CartError::ExceedsStock {
                requested: 5,
                available: 4
            }
        );
        assert!(err.is_conflict());
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_size_rules() {
        let tee = product(1, 5, &["S"]);
        let scarf = product(2, 5, &[]);
        let mut cart = Cart::default();
        assert_eq!(cart.add(&tee, None, 1), Err(CartError::SizeRequired));
        assert_eq!(cart.add(&tee, Some("   "), 1), Err(CartError::SizeRequired));
        assert_eq!(
            cart.add(&tee, Some("XL"), 1),
            Err(CartError::UnknownSize("XL".to_owned()))
        );
        assert_eq!(
            cart.add(&scarf, Some("M"), 1),
            Err(CartError::SizeNotApplicable)
        );
        assert!(cart.add(&scarf, None, 1).is_ok());
    }

    #[test]
    fn test_rejects_zero_and_inactive() {
        let mut tee = product(1, 5, &[]);
        let mut cart = Cart::default();
        assert_eq!(cart.add(&tee, None, 0), Err(CartError::InvalidQuantity));
        tee.active = false;
        assert_eq!(cart.add(&tee, None, 1), Err(CartError::Inactive(tee.id)));
    }

    #[test]
    fn test_set_quantity() {
        let tee = product(1, 5, &["M"]);
        let key = CartKey::new(tee.id, Some("M"));
        let mut cart = Cart::default();
        assert_eq!(
            cart.set_quantity(&key, 1, &tee),
            Err(CartError::NotInCart)
        );
        cart.add(&tee, Some("M"), 1).unwrap();
        let line = cart.set_quantity(&key, 5, &tee).unwrap().unwrap();
        assert_eq!(line.quantity, 5);
        assert!(cart.set_quantity(&key, 6, &tee).is_err());
        assert_eq!(cart.set_quantity(&key, 0, &tee).unwrap(), None);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove() {
        let tee = product(1, 5, &[]);
        let mut cart = Cart::default();
        cart.add(&tee, None, 2).unwrap();
        let key = CartKey::new(tee.id, None);
        assert_eq!(cart.remove(&key).unwrap().quantity, 2);
        assert!(cart.remove(&key).is_none());
    }

    #[test]
    fn test_priced_cart_flags_oversold_lines() {
        let tee = product(1, 1, &[]);
        let lines = vec![CartLine {
            product_id: tee.id,
            size: None,
            quantity: 3,
        }];
        let priced = PricedCart::new(&lines, std::slice::from_ref(&tee));
        assert_eq!(priced.subtotal, Price::parse("60.00").unwrap());
        assert_eq!(priced.total_quantity, 3);
        assert!(!priced.lines[0].available);
    }
}
