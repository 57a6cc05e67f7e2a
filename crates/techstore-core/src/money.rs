//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                                  │
//! │                                                                         │
//! │  A credit of $1,000.00 paid in three instalments must land on exactly  │
//! │  $0.00 remaining, otherwise the credit never flips to "paid".          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    100000 - 40000 - 60000 = 0  ✅                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use techstore_core::money::Money;
//!
//! let price = Money::from_cents(129_900); // $1,299.00
//! let line = price.multiply_quantity(2).unwrap();
//! assert_eq!(line.cents(), 259_800);
//! assert_eq!(line.to_string(), "$2,598.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in cents.
///
/// ## Where Money is Used
/// ```text
/// Product.sale_price_cents ──► SaleLine.unit_price ──► SaleLine.subtotal
///                                                            │
///                                    Σ subtotal ◄────────────┘
///                                        │
///                                        ▼
///                              Sale.total ──► Credit.total_balance
///                                                   │
///                          Payment.amount ──► Credit.remaining_balance
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use techstore_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole units and cents.
    ///
    /// ## Example
    /// ```rust
    /// use techstore_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
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

    /// Returns the whole-unit portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
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

    /// Multiplies money by a quantity. `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use techstore_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_cents(i64::MAX).multiply_quantity(2), None);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts. `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sums amounts, stopping at the first overflow.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }

    /// Subtracts `other`, flooring the result at zero.
    ///
    /// This is the credit repayment rule: overpaying never produces a
    /// negative balance.
    ///
    /// ## Example
    /// ```rust
    /// use techstore_core::money::Money;
    ///
    /// let remaining = Money::from_cents(600);
    /// assert_eq!(remaining.minus_floor_zero(Money::from_cents(400)).cents(), 200);
    /// assert_eq!(remaining.minus_floor_zero(Money::from_cents(900)).cents(), 0);
    /// ```
    #[inline]
    pub const fn minus_floor_zero(&self, other: Money) -> Self {
        let diff = self.0 - other.0;
        if diff < 0 {
            Money(0)
        } else {
            Money(diff)
        }
    }

    /// Extracts the VAT portion from a VAT-inclusive amount.
    ///
    /// ## Formula
    /// ```text
    /// vat = gross × rate / (10000 + rate)      (rate in basis points)
    ///
    /// gross $115.00 at 15% (1500 bps):
    ///   11500 × 1500 / 11500 = 1500 cents = $15.00
    /// ```
    ///
    /// Rounds half up using integer math.
    pub fn included_vat(&self, rate_bps: u32) -> Money {
        let rate = rate_bps as i128;
        let divisor = 10_000 + rate;
        let vat = (self.0 as i128 * rate * 2 + divisor) / (divisor * 2);
        Money::from_cents(vat as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders as `$1,234.56` (thousands separated, two decimals).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let whole = self.dollars().abs().to_string();

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        write!(f, "{}${}.{:02}", sign, grouped, self.cents_part())
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

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
