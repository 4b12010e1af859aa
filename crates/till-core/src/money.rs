//! # Money Module
//!
//! Provides the `Money` type for monetary values and `TaxRate` for
//! basis-point rates.
//!
//! ## Integer Cents
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  (30.00 - 0.00) × 1.12 in floating point = 33.600000000000001          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents + Basis Points                             │
//! │    3000 cents × 1200 bps / 10000 = 360 cents                            │
//! │    total = 3000 + 360 = 3360 cents, exactly                             │
//! │                                                                         │
//! │  Rounding happens once, half-up, on the cent.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::money::{Money, TaxRate};
//!
//! let price = Money::from_cents(1000); // $10.00
//! let line = price * 3;                // $30.00
//! let tax = line.calculate_tax(TaxRate::from_bps(1200));
//! assert_eq!(tax.cents(), 360);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

/// Denominator for basis-point arithmetic (10000 bps = 100%).
const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price_cents ──► CartLine.unit_price ──► line total             │
/// │                                                                         │
/// │  subtotal ─► - discount ─► taxable ─► + tax ─► total ─► change          │
/// │                                                                         │
/// │  EVERY monetary value in the system flows through this type            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // $10.99
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

    /// Returns the dollars portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero.
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

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        Money(self.0.min(other.0))
    }

    /// Clamps negative values to zero.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-1360).floor_zero(), Money::zero());
    /// assert_eq!(Money::from_cents(250).floor_zero().cents(), 250);
    /// ```
    #[inline]
    pub fn floor_zero(self) -> Money {
        Money(self.0.max(0))
    }

    /// Returns `bps` basis points of this amount, rounded half-up on the cent.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// // 10% of $100.00
    /// assert_eq!(Money::from_cents(10_000).percentage_of(1000).cents(), 1000);
    /// // 12% of $0.05 = $0.006 → $0.01
    /// assert_eq!(Money::from_cents(5).percentage_of(1200).cents(), 1);
    /// ```
    pub fn percentage_of(&self, bps: u32) -> Money {
        // i128 keeps large sale amounts from overflowing during the multiply
        let scaled = self.0 as i128 * bps as i128;
        let half = BPS_SCALE / 2;
        let rounded = if scaled >= 0 {
            (scaled + half) / BPS_SCALE
        } else {
            (scaled - half) / BPS_SCALE
        };
        Money::from_cents(rounded as i64)
    }

    /// Calculates tax on this amount.
    ///
    /// ## User Workflow
    /// ```text
    /// Taxable: $30.00
    ///      │
    ///      ▼
    /// calculate_tax(12%) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Tax: $3.60
    ///      │
    ///      ▼
    /// Total: $33.60
    /// ```
    #[inline]
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        self.percentage_of(rate.bps())
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// `self + other`, or `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `self - other`, or `None` on overflow.
    #[inline]
    pub const fn checked_sub(self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `self × qty`, or `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1000).checked_mul(3), Some(Money::from_cents(3000)));
    /// assert_eq!(Money::from_cents(i64::MAX / 2 + 1).checked_mul(2), None);
    /// ```
    #[inline]
    pub const fn checked_mul(self, qty: i64) -> Option<Money> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly display ("$10.99"). Clients format for their locale.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.dollars().abs(), self.cents_part())
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
// Tax Rate
// =============================================================================

/// Tax rate in basis points (1 bps = 0.01%).
///
/// 1200 bps = 12% VAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::from_bps(crate::DEFAULT_TAX_RATE_BPS)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(3360).to_string(), "$33.60");
        assert_eq!(Money::from_cents(-550).to_string(), "-$5.50");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(250);
        assert_eq!((a + b).cents(), 1250);
        assert_eq!((a - b).cents(), 750);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 1500);
    }

    #[test]
    fn test_twelve_percent_vat() {
        let rate = TaxRate::default();
        assert_eq!(rate.bps(), 1200);
        assert_eq!(Money::from_cents(3000).calculate_tax(rate).cents(), 360);
        // 12% of $0.04 = $0.0048 → $0.00
        assert_eq!(Money::from_cents(4).calculate_tax(rate).cents(), 0);
        // 12% of $0.05 = $0.006 → $0.01
        assert_eq!(Money::from_cents(5).calculate_tax(rate).cents(), 1);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 12.5% of $0.04 = 0.5 cent → 1 cent
        assert_eq!(Money::from_cents(4).percentage_of(1250).cents(), 1);
        // 10% of $0.04 = 0.4 cent → 0
        assert_eq!(Money::from_cents(4).percentage_of(1000).cents(), 0);
        assert_eq!(Money::from_cents(-4).percentage_of(1250).cents(), -1);
    }

    #[test]
    fn test_checked_arithmetic() {
        let big = Money::from_cents(i64::MAX);
        assert_eq!(big.checked_add(Money::from_cents(1)), None);
        assert_eq!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)), None);
        assert_eq!(Money::from_cents(i64::MAX / 2 + 1).checked_mul(2), None);

        let a = Money::from_cents(1000);
        assert_eq!(a.checked_add(a), Some(Money::from_cents(2000)));
        assert_eq!(a.checked_sub(a), Some(Money::zero()));
        assert_eq!(a.checked_mul(3), Some(Money::from_cents(3000)));
    }

    #[test]
    fn test_min_and_floor() {
        let a = Money::from_cents(500);
        let b = Money::from_cents(300);
        assert_eq!(a.min(b), b);
        assert_eq!((b - a).floor_zero(), Money::zero());
    }
}
