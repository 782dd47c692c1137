//! Route constraints and the limits they resolve to.
//!
//! A [`Constraint`] is what the caller asks for. A [`Limit`] is that
//! constraint resolved for one optimisation session: percentage budgets are
//! turned into an absolute amount against the base route's cost.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Cost;

/// Caller-supplied constraint on a route's tolls.
///
/// # Examples
///
/// ```
/// use tollgate_core::{Constraint, Cost, Limit};
///
/// let constraint = Constraint::max_budget_percentage(0.7).expect("valid share");
/// let limit = constraint.resolve(Cost::from_cents(2000));
/// assert_eq!(limit, Limit::Budget(Cost::from_cents(1400)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// At most this many toll stations.
    MaxTollCount(u32),
    /// At most this amount in total.
    MaxBudgetAbsolute(Cost),
    /// At most this share of the base route's cost, in `[0, 1]`.
    MaxBudgetPercentage(f64),
}

/// Which family a [`Constraint`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintMode {
    /// Limit on the number of tolls.
    TollCount,
    /// Absolute money budget.
    AbsoluteBudget,
    /// Budget relative to the base route.
    PercentageBudget,
}

/// Errors raised when a constraint is out of range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintError {
    /// A toll count below zero was supplied.
    #[error("maximum toll count must not be negative (got {0})")]
    NegativeTollCount(i64),
    /// A toll count larger than the supported range was supplied.
    #[error("maximum toll count {0} is too large")]
    TollCountTooLarge(i64),
    /// A budget below zero or not finite was supplied.
    #[error("budget must be a finite, non-negative euro amount (got {0})")]
    InvalidBudget(f64),
    /// A percentage outside `[0, 1]` was supplied.
    #[error("budget percentage must lie within [0, 1] (got {0})")]
    PercentageOutOfRange(f64),
}

impl Constraint {
    /// Validate a raw toll count.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError::NegativeTollCount`] for negative input and
    /// [`ConstraintError::TollCountTooLarge`] beyond `u32::MAX`.
    pub fn max_toll_count(count: i64) -> Result<Self, ConstraintError> {
        if count < 0 {
            return Err(ConstraintError::NegativeTollCount(count));
        }
        u32::try_from(count)
            .map(Self::MaxTollCount)
            .map_err(|_| ConstraintError::TollCountTooLarge(count))
    }

    /// Validate a raw euro budget.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError::InvalidBudget`] for negative or non-finite
    /// input.
    pub fn max_budget_absolute(euros: f64) -> Result<Self, ConstraintError> {
        Cost::from_euros(euros)
            .map(Self::MaxBudgetAbsolute)
            .ok_or(ConstraintError::InvalidBudget(euros))
    }

    /// Validate a raw budget share.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError::PercentageOutOfRange`] unless the share is
    /// finite and within `[0, 1]`.
    pub fn max_budget_percentage(share: f64) -> Result<Self, ConstraintError> {
        let constraint = Self::MaxBudgetPercentage(share);
        constraint.validate()?;
        Ok(constraint)
    }

    /// Re-check a constraint built directly from its variants.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError::PercentageOutOfRange`] for a share outside
    /// `[0, 1]`; the other variants are valid by construction.
    pub fn validate(&self) -> Result<(), ConstraintError> {
        match *self {
            Self::MaxBudgetPercentage(share) if !(0.0..=1.0).contains(&share) => {
                Err(ConstraintError::PercentageOutOfRange(share))
            }
            _ => Ok(()),
        }
    }

    /// The family of this constraint.
    #[must_use]
    pub const fn mode(&self) -> ConstraintMode {
        match self {
            Self::MaxTollCount(_) => ConstraintMode::TollCount,
            Self::MaxBudgetAbsolute(_) => ConstraintMode::AbsoluteBudget,
            Self::MaxBudgetPercentage(_) => ConstraintMode::PercentageBudget,
        }
    }

    /// Resolve against the base route's cost.
    #[must_use]
    pub fn resolve(&self, base_cost: Cost) -> Limit {
        match *self {
            Self::MaxTollCount(count) => Limit::Count(count),
            Self::MaxBudgetAbsolute(budget) => Limit::Budget(budget),
            Self::MaxBudgetPercentage(share) => Limit::Budget(base_cost.scale_down(share)),
        }
    }
}

/// A constraint resolved for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    /// Maximum number of tolls.
    Count(u32),
    /// Maximum total cost.
    Budget(Cost),
}

impl Limit {
    /// True when a route with `toll_count` tolls costing `cost` complies.
    #[must_use]
    pub fn is_satisfied_by(&self, toll_count: usize, cost: Cost) -> bool {
        match *self {
            Self::Count(max) => u32::try_from(toll_count).is_ok_and(|count| count <= max),
            Self::Budget(max) => cost <= max,
        }
    }

    /// True for a zero toll count or a zero budget.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        match *self {
            Self::Count(max) => max == 0,
            Self::Budget(max) => max.is_zero(),
        }
    }

    /// True for budget limits.
    #[must_use]
    pub const fn is_budget(&self) -> bool {
        matches!(self, Self::Budget(_))
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(max) => write!(f, "at most {max} tolls"),
            Self::Budget(max) => write!(f, "at most {max}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn rejects_negative_toll_count() {
        assert_eq!(
            Constraint::max_toll_count(-1),
            Err(ConstraintError::NegativeTollCount(-1))
        );
    }

    #[rstest]
    #[case(-0.01)]
    #[case(1.01)]
    #[case(f64::NAN)]
    fn rejects_out_of_range_percentages(#[case] share: f64) {
        assert!(Constraint::max_budget_percentage(share).is_err());
    }

    #[rstest]
    #[case(0.0)]
    #[case(1.0)]
    fn accepts_boundary_percentages(#[case] share: f64) {
        assert!(Constraint::max_budget_percentage(share).is_ok());
    }

    #[rstest]
    fn rejects_negative_budget() {
        assert!(matches!(
            Constraint::max_budget_absolute(-5.0),
            Err(ConstraintError::InvalidBudget(_))
        ));
    }

    #[rstest]
    #[case(Limit::Count(1), 1, 9_999, true)]
    #[case(Limit::Count(1), 2, 0, false)]
    #[case(Limit::Budget(Cost::from_cents(1400)), 5, 1400, true)]
    #[case(Limit::Budget(Cost::from_cents(1400)), 0, 1401, false)]
    fn checks_compliance(
        #[case] limit: Limit,
        #[case] count: usize,
        #[case] cents: u64,
        #[case] expected: bool,
    ) {
        assert_eq!(
            limit.is_satisfied_by(count, Cost::from_cents(cents)),
            expected
        );
    }

    #[rstest]
    fn resolves_percentage_against_base_cost() {
        let constraint = Constraint::MaxBudgetPercentage(0.7);
        assert_eq!(
            constraint.resolve(Cost::from_cents(2000)),
            Limit::Budget(Cost::from_cents(1400))
        );
    }

    #[rstest]
    fn percentage_limits_never_exceed_the_exact_share() {
        let limit = Constraint::MaxBudgetPercentage(0.7).resolve(Cost::from_cents(2001));
        assert_eq!(limit, Limit::Budget(Cost::from_cents(1400)));
        assert!(!limit.is_satisfied_by(1, Cost::from_cents(1401)));
    }

    #[rstest]
    fn deserialises_from_snake_case_json() {
        let constraint: Constraint =
            serde_json::from_str(r#"{"max_toll_count": 2}"#).expect("valid json");
        assert_eq!(constraint, Constraint::MaxTollCount(2));
    }
}
