//! # Money Module
//!
//! Provides the `Money` type for Chilean peso amounts.
//!
//! ## Why Integer Pesos?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CLP HAS NO MINOR UNIT                                                  │
//! │                                                                         │
//! │  Every amount on a quote, a sales note or an invoice is a whole        │
//! │  number of pesos. Fractions only appear transiently:                   │
//! │                                                                         │
//! │    2,5 m3 × $41.990  = $104.975        (rounded line total)            │
//! │    $104.975 × 19%    = $19.945,25 → $19.945  (rounded IVA)             │
//! │                                                                         │
//! │  We round at those two points and keep i64 everywhere else.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cotiza_core::money::Money;
//!
//! let precio = Money::from_pesos(41_990);
//! let linea = precio.line_total(2.5);
//! assert_eq!(linea.pesos(), 104_975);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in whole Chilean pesos.
///
/// Serializes as a bare integer so JSON bodies carry `"total": 119000`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole pesos.
    #[inline]
    pub const fn from_pesos(pesos: i64) -> Self {
        Money(pesos)
    }

    /// Returns the value in pesos.
    #[inline]
    pub const fn pesos(&self) -> i64 {
        self.0
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

    /// Calculates tax on this amount, rounding half up.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`. The +5000 provides the
    /// rounding (5000/10000 = 0.5), which matches `Math.round(neto * 0.19)`
    /// for the non-negative amounts quotes carry.
    ///
    /// ## Example
    /// ```rust
    /// use cotiza_core::money::Money;
    /// use cotiza_core::IVA;
    ///
    /// // $104.975 × 19% = $19.945,25 → $19.945
    /// assert_eq!(Money::from_pesos(104_975).calculate_tax(IVA).pesos(), 19_945);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        self.percentage(rate.bps())
    }

    /// Returns `bps` basis points of this amount, rounded half up.
    ///
    /// Used for quote-level discounts: 550 bps is a 5,5% discount.
    pub fn percentage(&self, bps: u32) -> Money {
        // i128 prevents overflow on large amounts
        let value = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money::from_pesos(value as i64)
    }

    /// Multiplies a unit price by a (possibly fractional) quantity.
    ///
    /// Quantities like 2,5 m3 of concrete are common, so the product is
    /// rounded to the nearest peso.
    pub fn line_total(&self, cantidad: f64) -> Money {
        Money::from_pesos((self.0 as f64 * cantidad).round() as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented display; use [`crate::format::format_clp`] for documents.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CLP {}", self.0)
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

impl From<i64> for Money {
    fn from(pesos: i64) -> Self {
        Money(pesos)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
