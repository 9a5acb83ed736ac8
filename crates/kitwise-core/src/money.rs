//! # Money Module
//!
//! Integer money for purchase prices, sell prices and sale amounts.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DERIVED COST OF A COMPOSITE                                            │
//! │                                                                         │
//! │  Floating point:                                                        │
//! │    3 × 0.10 + 2 × 0.20 = 0.7000000000000001                             │
//! │                                                                         │
//! │  Integer cents:                                                         │
//! │    3 × 10 + 2 × 20 = 70                                                 │
//! │                                                                         │
//! │  Sum of amounts before and after decomposition must match EXACTLY,     │
//! │  so every amount is an i64 count of cents.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kitwise_core::money::Money;
//!
//! let unit = Money::parse_decimal("12,50").unwrap();
//! assert_eq!(unit.cents(), 1250);
//! assert_eq!((unit * 3i64).cents(), 3750);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents.
///
/// Signed: returns produce negative line amounts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
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

    /// Checks if the value is strictly positive.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.saturating_abs())
    }

    /// Adds, clamping at the `i64` bounds instead of overflowing.
    #[inline]
    pub const fn saturating_add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }

    /// Converts a tax-included amount to its tax-excluded value.
    ///
    /// ## Formula
    /// `excl = incl × 10000 / (10000 + bps)`, rounded half away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use kitwise_core::money::{Money, TaxRate};
    ///
    /// let incl = Money::from_cents(1200);
    /// assert_eq!(incl.excluding_tax(TaxRate::from_bps(2000)).cents(), 1000);
    /// ```
    pub fn excluding_tax(&self, rate: TaxRate) -> Money {
        let divisor = 10_000i128 + rate.bps() as i128;
        let scaled = self.0 as i128 * 10_000;
        // Symmetric rounding so that returns mirror sales
        let half = divisor / 2;
        let rounded = if scaled >= 0 {
            (scaled + half) / divisor
        } else {
            (scaled - half) / divisor
        };
        Money(rounded as i64)
    }

    /// Parses a decimal amount as found in spreadsheets.
    ///
    /// ## Accepted Forms
    /// ```text
    /// "12.50"       → 1250
    /// "12,50"       → 1250     (comma decimal separator)
    /// "1 234,50 €"  → 123450   (grouping spaces, currency symbol)
    /// "1.234,50"    → 123450   (last separator is the decimal one)
    /// "-3.5"        → -350
    /// "9.999"       → 1000     (third decimal rounds half up)
    /// ```
    pub fn parse_decimal(input: &str) -> Result<Money, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: format!("{} in '{}'", reason, input),
        };

        let mut body = String::with_capacity(input.len());
        for c in input.chars() {
            match c {
                '0'..='9' | ',' | '.' | '-' | '+' => body.push(c),
                '€' | '$' | '£' => {}
                c if c.is_whitespace() => {}
                _ => return Err(invalid("unexpected character")),
            }
        }

        let (negative, body) = match body.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, body.strip_prefix('+').unwrap_or(&body)),
        };

        if body.is_empty() {
            return Err(ValidationError::Required {
                field: "amount".to_string(),
            });
        }

        let (int_part, frac_part) = match body.rfind([',', '.']) {
            Some(idx) => (&body[..idx], &body[idx + 1..]),
            None => (body, ""),
        };

        let int_digits: String = int_part.chars().filter(|c| *c != ',' && *c != '.').collect();
        if !int_digits.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("misplaced sign"));
        }
        if int_digits.is_empty() && frac_part.is_empty() {
            return Err(invalid("no digits"));
        }

        let units: i64 = if int_digits.is_empty() {
            0
        } else {
            int_digits.parse().map_err(|_| invalid("amount too large"))?
        };

        let frac_bytes = frac_part.as_bytes();
        let digit = |i: usize| frac_bytes.get(i).map(|b| (b - b'0') as i64).unwrap_or(0);
        let mut cents_part = digit(0) * 10 + digit(1);
        if digit(2) >= 5 {
            cents_part += 1;
        }

        let cents = units
            .checked_mul(100)
            .and_then(|c| c.checked_add(cents_part))
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (2000 = 20%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering ("12.50", "-3.05"). Currency display is the caller's job.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
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

impl Mul<u32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: u32) -> Self {
        Money(self.0 * qty as i64)
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
