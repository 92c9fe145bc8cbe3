//! # Money Module
//!
//! Provides the `Money` type for sale totals, discounts and unit prices.
//!
//! ## Integer Cents Only
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A sale total is persisted, reversed and summed across reports.        │
//! │  Any drift between what was charged and what the ledger says is a bug. │
//! │                                                                         │
//! │    binary float:   0.1 + 0.2 = 0.30000000000000004                      │
//! │    integer cents:  10 + 20   = 30                                       │
//! │                                                                         │
//! │  Every amount is a whole number of cents. Percentages are applied      │
//! │  with widened integer math and a single, explicit rounding step.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::money::Money;
//!
//! let price = Money::from_cents(1099); // $10.99
//! let line = price.checked_mul_quantity(3).unwrap();
//! assert_eq!(line.cents(), 3297);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::Percentage;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money Flows
/// ```text
/// SaleLine.unit_price × quantity ──► raw total
///                                        │
///                         coupon ──► discount
///                                        │
///                                        ▼
///                       Transaction.total = raw total - discount
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from dollars and cents.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -$5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-dollar portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a line quantity, `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299); // $2.99
    /// assert_eq!(unit_price.checked_mul_quantity(3).unwrap().cents(), 897);
    /// assert!(Money::from_cents(i64::MAX).checked_mul_quantity(2).is_none());
    /// ```
    #[inline]
    pub const fn checked_mul_quantity(&self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns `pct` percent of this amount, rounded half up to whole cents.
    ///
    /// ## Rounding
    /// ```text
    /// discount = (amount × pct + 50) / 100     (widened to i128)
    ///
    ///   10000 × 10% → (100000 + 50) / 100 = 1000
    ///     999 × 15% → ( 14985 + 50) / 100 =  150   (149.85 rounds up)
    ///       1 × 50% → (    50 + 50) / 100 =    1   (0.5 rounds up)
    /// ```
    ///
    /// For a non-negative amount and `pct <= 100` the result never exceeds
    /// the amount, so `amount - discount` stays non-negative.
    pub fn percentage_of(&self, pct: Percentage) -> Money {
        let cents = (self.0 as i128 * pct.value() as i128 + 50) / 100;
        Money(cents as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering. Output formatting for callers uses raw cents.
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

impl Default for Money {
    fn default() -> Self {
        Money::zero()
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
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

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(v: u8) -> Percentage {
        Percentage::new(v).unwrap()
    }

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::zero()), "$0.00");
    }

    #[test]
    fn test_percentage_of_exact() {
        assert_eq!(Money::from_cents(10_000).percentage_of(pct(10)).cents(), 1_000);
    }

    #[test]
    fn test_percentage_of_rounds_half_up() {
        // 149.85 -> 150
        assert_eq!(Money::from_cents(999).percentage_of(pct(15)).cents(), 150);
        // 0.5 -> 1
        assert_eq!(Money::from_cents(1).percentage_of(pct(50)).cents(), 1);
        // 0.33 -> 0
        assert_eq!(Money::from_cents(1).percentage_of(pct(33)).cents(), 0);
    }

    #[test]
    fn test_percentage_of_bounds() {
        let amount = Money::from_cents(12_345);
        assert!(amount.percentage_of(pct(0)).is_zero());
        assert_eq!(amount.percentage_of(pct(100)), amount);
    }

    #[test]
    fn test_percentage_of_large_amount_does_not_overflow() {
        let amount = Money::from_cents(i64::MAX / 2);
        let discount = amount.percentage_of(pct(100));
        assert_eq!(discount, amount);
    }

    #[test]
    fn test_checked_arithmetic() {
        assert_eq!(
            Money::from_cents(299).checked_mul_quantity(3),
            Some(Money::from_cents(897))
        );
        assert_eq!(Money::from_cents(i64::MAX).checked_mul_quantity(2), None);
        assert_eq!(
            Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)),
            None
        );
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 5]
            .into_iter()
            .map(Money::from_cents)
            .sum();
        assert_eq!(total.cents(), 355);
    }
}
