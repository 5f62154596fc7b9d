//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                         │
//! │                                                                     │
//! │  In JavaScript/floating point:                                      │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                        │
//! │                                                                     │
//! │  The ledger runs three running balances (buyer, user cash,          │
//! │  per-method) off signed increments. Accumulated float error in a    │
//! │  running balance never heals.                                       │
//! │                                                                     │
//! │  OUR SOLUTION: Integer Cents                                        │
//! │    Every increment is an exact i64. Fractional quantities           │
//! │    (qty × measurement) are rounded to cents ONCE, at the line       │
//! │    level, and the rounded value is what hits every ledger.          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use mana_core::money::Money;
//!
//! // Create from cents (preferred)
//! let price = Money::from_cents(2000); // $20.00
//!
//! // A sale line: 3 units at measurement 1.0
//! let line = price.mul_measured(3.0, 1.0);
//! assert_eq!(line.cents(), 6000);
//!
//! // Fractional measurement rounds half away from zero
//! let gram_price = Money::from_cents(1099);
//! assert_eq!(gram_price.mul_measured(1.0, 3.5).cents(), 3847); // 3846.5 → 3847
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: negative values are first-class; buyer balances swing
///   both ways (receivable vs. credit), returns produce negative log amounts
/// - **Single field tuple struct**: zero-cost abstraction over i64
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by an integer quantity. Exact.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Multiplies a unit price by `qty × measurement`, rounding half away
    /// from zero to whole cents.
    ///
    /// This is THE line-total primitive: every ledger-affecting amount
    /// (`round(sale_price·measurement·qty)`, `round(price·measurement·qty)`)
    /// goes through here so that the rounded cents applied to a balance are
    /// identical to the rounded cents stored on the line.
    ///
    /// ## Example
    /// ```rust
    /// use mana_core::money::Money;
    ///
    /// let unit = Money::from_cents(1200); // $12.00
    /// assert_eq!(unit.mul_measured(3.0, 1.0).cents(), 3600);
    /// assert_eq!(unit.mul_measured(1.0, 0.5).cents(), 600);
    /// ```
    pub fn mul_measured(&self, qty: f64, measurement: f64) -> Money {
        let raw = self.0 as f64 * qty * measurement;
        Money(raw.round() as i64)
    }

    /// Multiplies money by a bare f64 factor, rounding half away from zero.
    /// Used for per-unit shipping × qty.
    pub fn mul_f64(&self, factor: f64) -> Money {
        Money((self.0 as f64 * factor).round() as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// Used by the activity logger when building per-item description strings.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
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

/// Negation flips a balance delta (credits vs. debits).
impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
