use crate::error::ShopError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

/// Largest accepted difference between the total a client submits at checkout
/// and the total recomputed from the catalog.
pub const PRICE_TOLERANCE: Decimal = dec!(0.01);

/// A monetary value in BRL.
///
/// Wraps `rust_decimal::Decimal` so totals are computed exactly; serialized as
/// a decimal string to keep that precision on the wire and at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

/// A strictly positive catalog price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// True when `other` is no further than `tolerance` away from this amount.
    pub fn is_within(&self, other: Decimal, tolerance: Decimal) -> bool {
        (self.0 - other).abs() <= tolerance
    }
}

impl Price {
    pub fn new(value: Decimal) -> Result<Self, ShopError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(ShopError::ValidationError(
                "O preço deve ser maior que zero.".to_string(),
            ))
        }
    }

    /// Parses a form value, accepting either `10.50` or `10,50`.
    pub fn parse(raw: &str) -> Result<Self, ShopError> {
        let normalized = raw.trim().replace(',', ".");
        let value = Decimal::from_str(&normalized)
            .map_err(|_| ShopError::ValidationError(format!("Preço inválido: {raw:?}")))?;
        Self::new(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn times(&self, quantity: u32) -> Money {
        Money(self.0 * Decimal::from(quantity))
    }
}

impl TryFrom<Decimal> for Price {
    type Error = ShopError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl From<Price> for Money {
    fn from(price: Price) -> Self {
        Self(price.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}
