//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    1.5 kg × $1.990 = 2984.9999999999995  ❌ WRONG!                       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Pesos + Integer Grams                            │
//! │    1990 × 1500 g / 1000 = 2985 (rounded half-up)                        │
//! │    Every rounding step is explicit and happens exactly once per line   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Chilean pesos have no minor unit, so one `Money` unit is one peso.
//!
//! ## Usage
//! ```rust
//! use frutiandante_core::money::Money;
//! use frutiandante_core::quantity::Quantity;
//!
//! let price = Money::from_units(1990);            // $1.990 per kg
//! let line = price.times(Quantity::from_milli(1500)); // 1.5 kg
//! assert_eq!(line.units(), 2985);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::quantity::Quantity;
use crate::types::DiscountRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (pesos).
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price ──► CartItem.unit_price ──► CartItem.line_total          │
/// │                                                │                        │
/// │                                                ▼                        │
/// │  CartSummary.subtotal ──► loyalty discount ──► CartSummary.total        │
/// │                                                │                        │
/// │                                                ▼                        │
/// │                                   Order document + WhatsApp message     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole pesos.
    ///
    /// ```rust
    /// use frutiandante_core::money::Money;
    ///
    /// assert_eq!(Money::from_units(1000).units(), 1000);
    /// ```
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units)
    }

    /// Returns the value in pesos.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Price of `quantity` when `self` is the price of one whole unit
    /// (one item, or one kilogram).
    ///
    /// Rounds half-up to the peso. Uses i128 so large carts cannot overflow
    /// the intermediate product.
    ///
    /// ```rust
    /// use frutiandante_core::money::Money;
    /// use frutiandante_core::quantity::Quantity;
    ///
    /// let per_kg = Money::from_units(999);
    /// // 0.25 kg × $999 = 249.75 → $250
    /// assert_eq!(per_kg.times(Quantity::from_milli(250)).units(), 250);
    /// ```
    pub fn times(&self, quantity: Quantity) -> Money {
        let scale = Quantity::SCALE as i128;
        let raw = self.0 as i128 * quantity.milli() as i128;
        let rounded = (raw + scale / 2).div_euclid(scale);
        Money(rounded as i64)
    }

    /// The portion of `self` given by `rate`, rounded half-up.
    ///
    /// ## User Workflow
    /// ```text
    /// Subtotal: $2.000
    ///      │
    ///      ▼
    /// portion(10%) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Discount: $200
    /// ```
    pub fn portion(&self, rate: DiscountRate) -> Money {
        let raw = self.0 as i128 * rate.bps() as i128;
        Money(((raw + 5000).div_euclid(10000)) as i64)
    }

    /// Subtracts the `rate` portion and returns what is left.
    ///
    /// ```rust
    /// use frutiandante_core::money::Money;
    /// use frutiandante_core::types::DiscountRate;
    ///
    /// let subtotal = Money::from_units(2000);
    /// assert_eq!(subtotal.apply_discount(DiscountRate::from_bps(1000)).units(), 1800);
    /// ```
    pub fn apply_discount(&self, rate: DiscountRate) -> Money {
        *self - self.portion(rate)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money the way Chilean receipts do: `$12.990`.
///
/// ## Note
/// Used for the WhatsApp order message and logs. The UI does its own
/// locale-aware formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        write!(f, "{}${}", sign, grouped)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
