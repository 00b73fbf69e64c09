//! # Quantity Module
//!
//! Cart quantities for both weight-sold goods (fractional kilograms) and
//! items sold by the unit.
//!
//! ## Representation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Quantity is an integer count of thousandths                            │
//! │                                                                         │
//! │    1 item        ──►  1000                                              │
//! │    1.5 kg        ──►  1500   (grams)                                    │
//! │    0.25 kg       ──►   250                                              │
//! │                                                                         │
//! │  On the wire (record store documents, local cart value) it is a plain   │
//! │  decimal number: 1.5, 2, 0.25                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

/// A non-negative amount of a product in thousandths of its sale unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quantity(i64);

impl Quantity {
    /// Thousandths per whole unit.
    pub const SCALE: i64 = 1000;

    /// Creates a quantity from thousandths (grams for kilogram goods).
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Creates a quantity of whole units.
    #[inline]
    pub const fn from_whole(units: i64) -> Self {
        Quantity(units * Self::SCALE)
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// True when this is a whole number of units.
    #[inline]
    pub const fn is_whole(&self) -> bool {
        self.0 % Self::SCALE == 0
    }

    /// Decimal value, for display and the wire format only.
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    /// Parses a decimal number, rounding to the nearest thousandth.
    ///
    /// Returns `None` for negative, NaN or infinite input.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        Some(Quantity((value * Self::SCALE as f64).round() as i64))
    }

    /// Adds, or `None` on overflow.
    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(Quantity)
    }

    /// Subtracts, stopping at zero.
    pub fn saturating_sub(self, other: Quantity) -> Quantity {
        Quantity((self.0 - other.0).max(0))
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), |acc, q| acc + q)
    }
}

/// `2`, `1.5`, `0.25`, with trailing zeros trimmed.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::SCALE;
        let frac = (self.0 % Self::SCALE).abs();
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let frac = format!("{:03}", frac);
        write!(f, "{}.{}", whole, frac.trim_end_matches('0'))
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_whole() {
            serializer.serialize_i64(self.0 / Self::SCALE)
        } else {
            serializer.serialize_f64(self.as_f64())
        }
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Quantity::from_f64(value)
            .ok_or_else(|| de::Error::custom(format!("invalid quantity: {}", value)))
    }
}
