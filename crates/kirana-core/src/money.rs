//! # Money Module
//!
//! Provides the `Money` type for handling rupee amounts safely.
//!
//! ## Two Precisions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WHERE PRECISION LIVES                                                  │
//! │                                                                         │
//! │  Stored / displayed:   Money(i64) in paise        ₹24.30 = 2430         │
//! │                                                                         │
//! │  Intermediate GST:     rust_decimal::Decimal      9% of ₹133.45         │
//! │                        (full precision)            = 12.0105            │
//! │                                                                         │
//! │  Money::from_decimal() is the ONLY way back from Decimal to paise,      │
//! │  rounding half away from zero (₹0.005 → ₹0.01).                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kirana_core::money::Money;
//! use rust_decimal::Decimal;
//!
//! let price = Money::from_paise(10999); // ₹109.99
//! let line = price * 2;                 // ₹219.98
//! assert_eq!(line.paise(), 21998);
//!
//! let tax = Decimal::new(120105, 4);    // 12.0105
//! assert_eq!(Money::from_decimal(tax).paise(), 1201);
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

/// Paise per rupee.
pub const PAISE_PER_RUPEE: i64 = 100;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in paise (1 rupee = 100 paise).
///
/// ## Design Decisions
/// - **i64 (signed)**: round-off adjustments can be negative
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    ///
    /// ## Example
    /// ```rust
    /// use kirana_core::money::Money;
    ///
    /// let price = Money::from_paise(4999); // ₹49.99
    /// assert_eq!(price.paise(), 4999);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * PAISE_PER_RUPEE)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// For negative amounts, only the rupee part should be negative:
    /// `from_rupees_paise(-5, 50)` = -₹5.50.
    #[inline]
    pub const fn from_rupees_paise(rupees: i64, paise: i64) -> Self {
        if rupees < 0 {
            Money(rupees * PAISE_PER_RUPEE - paise)
        } else {
            Money(rupees * PAISE_PER_RUPEE + paise)
        }
    }

    /// Converts a full-precision decimal rupee amount to paise.
    ///
    /// ## Rounding
    /// Half away from zero at the second decimal place, the retail
    /// convention for settled GST amounts. Values beyond the i64 range
    /// saturate.
    ///
    /// ## Example
    /// ```rust
    /// use kirana_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(Money::from_decimal(Decimal::new(24_305, 3)).paise(), 2431); // 24.305
    /// assert_eq!(Money::from_decimal(Decimal::new(-24_305, 3)).paise(), -2431);
    /// ```
    pub fn from_decimal(rupees: Decimal) -> Self {
        let paise = (rupees * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

        match paise.to_i64() {
            Some(p) => Money(p),
            None if paise.is_sign_negative() => Money(i64::MIN),
            None => Money(i64::MAX),
        }
    }

    /// Returns the value as a decimal rupee amount (exact).
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / PAISE_PER_RUPEE
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % PAISE_PER_RUPEE).abs()
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

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Rounds to the nearest whole rupee, half away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use kirana_core::money::Money;
    ///
    /// assert_eq!(Money::from_paise(35040).round_to_rupee().paise(), 35000);
    /// assert_eq!(Money::from_paise(35050).round_to_rupee().paise(), 35100);
    /// ```
    pub fn round_to_rupee(&self) -> Money {
        let rupees = self
            .to_decimal()
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        Money::from_decimal(rupees)
    }

    /// Adds two amounts, or `None` if the sum leaves the i64 range.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Money(sum)),
            None => None,
        }
    }

    /// Adds two amounts, clamping at the i64 bounds.
    #[inline]
    pub const fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    /// Returns true when `other` is within `tolerance` of this amount.
    /// A negative tolerance matches nothing.
    #[inline]
    pub const fn within(&self, other: Money, tolerance: Money) -> bool {
        tolerance.0 >= 0 && self.0.abs_diff(other.0) <= tolerance.0 as u64
    }

    /// Returns the larger of this amount and zero.
    #[inline]
    pub const fn floor_zero(&self) -> Money {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows rupees with two decimals, e.g. `₹350.40`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
