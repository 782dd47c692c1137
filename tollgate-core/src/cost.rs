//! Money amounts for toll pricing.
//!
//! Costs are held as whole euro cents so that comparisons against a budget
//! never suffer from floating-point drift. Conversions from euros round to
//! the nearest cent.

use std::fmt;
use std::iter::Sum;

use serde::{Deserialize, Serialize};

/// Representation error tolerated when truncating a scaled amount.
const SCALE_SLACK_CENTS: f64 = 1e-6;

/// A non-negative toll amount in euro cents.
///
/// # Examples
///
/// ```
/// use tollgate_core::Cost;
///
/// let cost = Cost::from_euros(13.5).expect("finite amount");
/// assert_eq!(cost.cents(), 1350);
/// assert_eq!(cost.to_string(), "€13.50");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cost(u64);

impl Cost {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Wrap an amount already expressed in cents.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Convert a euro amount, rounding to the nearest cent.
    ///
    /// Returns `None` for negative or non-finite input.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "euro amounts are validated non-negative and finite before rounding to cents"
    )]
    pub fn from_euros(euros: f64) -> Option<Self> {
        if !euros.is_finite() || euros < 0.0 {
            return None;
        }
        Some(Self((euros * 100.0).round() as u64))
    }

    /// Amount in cents.
    #[must_use]
    pub const fn cents(self) -> u64 {
        self.0
    }

    /// Amount in euros, for display and reporting.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_precision_loss,
        reason = "reporting conversion; cent totals stay far below 2^52"
    )]
    pub fn euros(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// True when the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Add two amounts, saturating at the maximum.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtract `other`, flooring at zero.
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Scale the amount by a non-negative factor, rounding to the nearest
    /// cent. Negative or non-finite factors yield zero.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        reason = "budget limits are fractions of a cent total and round back to cents"
    )]
    pub fn scale(self, factor: f64) -> Self {
        if !factor.is_finite() || factor <= 0.0 {
            return Self::ZERO;
        }
        Self((self.0 as f64 * factor).round() as u64)
    }

    /// Scale the amount by a non-negative factor, rounding down to whole
    /// cents so a derived limit never exceeds the exact product. Products
    /// within a millionth of a cent of the next cent count as that cent.
    /// Negative or non-finite factors yield zero.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        reason = "budget limits truncate back to whole cents"
    )]
    pub fn scale_down(self, factor: f64) -> Self {
        if !factor.is_finite() || factor <= 0.0 {
            return Self::ZERO;
        }
        Self((self.0 as f64 * factor + SCALE_SLACK_CENTS).floor() as u64)
    }

    /// Absolute difference between two amounts.
    #[must_use]
    pub const fn abs_diff(self, other: Self) -> Self {
        Self(self.0.abs_diff(other.0))
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "€{}.{:02}",
            self.0.div_euclid(100),
            self.0.rem_euclid(100)
        )
    }
}

impl Sum for Cost {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl<'a> Sum<&'a Self> for Cost {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
