//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are whole-currency amounts (dollars, not cents) with at most two
//! fractional digits. They are stored as `NUMERIC(12, 2)` and travel over JSON
//! as strings (`"19.99"`) so no float rounding ever touches them.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount has more than two fractional digits.
    #[error("price can have at most two decimal places")]
    TooPrecise,
    /// The input is not a decimal number.
    #[error("price is not a valid number")]
    Invalid,
}

/// A non-negative amount of money with cent precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Maximum number of fractional digits.
    pub const MAX_SCALE: u32 = 2;

    /// Validate a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] or [`PriceError::TooPrecise`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount.normalize().scale() > Self::MAX_SCALE {
            return Err(PriceError::TooPrecise);
        }
        let mut amount = amount;
        amount.rescale(Self::MAX_SCALE);
        Ok(Self(amount))
    }

    /// Parse a price from a string such as `"19.99"`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Invalid`] when the string is not a number, or the
    /// errors of [`Price::new`].
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| PriceError::Invalid)?;
        Self::new(amount)
    }

    /// Build a price from an integer number of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), Self::MAX_SCALE))
    }

    /// A zero price.
    #[must_use]
    pub const fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Whether this price is zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// This price multiplied by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!(Price::parse("19.9").unwrap().to_string(), "$19.90");
        assert_eq!(Price::parse(" 5 ").unwrap().to_string(), "$5.00");
        assert_eq!(Price::parse("0").unwrap(), Price::zero());
    }

    #[test]
    fn test_rejects_invalid_amounts() {
        assert_eq!(Price::parse("-1"), Err(PriceError::Negative));
        assert_eq!(Price::parse("1.005"), Err(PriceError::TooPrecise));
        assert_eq!(Price::parse("ten"), Err(PriceError::Invalid));
    }

    #[test]
    fn test_trailing_zeros_are_not_extra_precision() {
        assert!(Price::parse("12.5000").is_ok());
    }

    #[test]
    fn test_arithmetic() {
        let unit = Price::parse("12.50").unwrap();
        assert_eq!(unit.times(3), Price::parse("37.50").unwrap());
        let total: Price = [unit, Price::from_cents(250)].into_iter().sum();
        assert_eq!(total, Price::parse("15.00").unwrap());
    }

    #[test]
    fn test_serde_uses_strings() {
        let price = Price::parse("42.10").unwrap();
        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(json, "\"42.10\"");
        assert!(serde_json::from_str::<Price>("\"-3\"").is_err());
    }
}
