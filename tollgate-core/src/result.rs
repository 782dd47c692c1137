//! Optimisation outcome: leader routes, status and statistics.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CacheStats, RouteAttempt};

/// Outcome classification of an optimisation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptimizationStatus {
    /// The base route already met the constraint.
    AlreadySatisfied,
    /// A toll-free route was found for a zero toll limit.
    NoTollSuccess,
    /// A toll-free route was found for a zero budget.
    BudgetZeroNoTollSuccess,
    /// A route within the toll limit was found.
    TollLimitSatisfied,
    /// A route within the budget was found.
    BudgetSatisfied,
    /// A route within the toll limit plus one was found.
    RelaxedTollLimitSatisfied,
    /// A route close to the budget was found after relaxing it.
    ClosestToBudgetFound,
    /// Tolls could not be avoided for a zero limit; the base route is
    /// returned.
    SomeTollsPresent,
    /// No route met the toll limit; the base route is returned.
    NoValidRouteWithMaxTolls,
    /// No route met the budget; the base route is returned.
    NoRouteWithinBudget,
    /// The session ran out of time; the base route is returned.
    SessionTimeout,
}

impl OptimizationStatus {
    /// Wire label, e.g. `BUDGET_SATISFIED`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlreadySatisfied => "ALREADY_SATISFIED",
            Self::NoTollSuccess => "NO_TOLL_SUCCESS",
            Self::BudgetZeroNoTollSuccess => "BUDGET_ZERO_NO_TOLL_SUCCESS",
            Self::TollLimitSatisfied => "TOLL_LIMIT_SATISFIED",
            Self::BudgetSatisfied => "BUDGET_SATISFIED",
            Self::RelaxedTollLimitSatisfied => "RELAXED_TOLL_LIMIT_SATISFIED",
            Self::ClosestToBudgetFound => "CLOSEST_TO_BUDGET_FOUND",
            Self::SomeTollsPresent => "SOME_TOLLS_PRESENT",
            Self::NoValidRouteWithMaxTolls => "NO_VALID_ROUTE_WITH_MAX_TOLLS",
            Self::NoRouteWithinBudget => "NO_ROUTE_WITHIN_BUDGET",
            Self::SessionTimeout => "SESSION_TIMEOUT",
        }
    }

    /// True when the returned routes meet the caller's constraint.
    #[must_use]
    pub const fn is_strict_success(self) -> bool {
        matches!(
            self,
            Self::AlreadySatisfied
                | Self::NoTollSuccess
                | Self::BudgetZeroNoTollSuccess
                | Self::TollLimitSatisfied
                | Self::BudgetSatisfied
        )
    }
}

impl fmt::Display for OptimizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// States of the fallback state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    /// Searching under the strict limit.
    Priority1Search,
    /// Searching under a limit relaxed by one step.
    Priority2Backup,
    /// Returning the base route.
    BaselineFallback,
    /// Terminal.
    Done,
}

/// A leader route together with its compliance flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leader {
    /// The winning attempt.
    pub attempt: RouteAttempt,
    /// True when the attempt meets the caller's strict constraint.
    pub compliant: bool,
}

/// Counters collected during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationStats {
    /// Combinations generated across all tiers.
    pub combinations_generated: usize,
    /// Combinations for which a route was requested.
    pub combinations_tested: usize,
    /// Combinations dropped by the pre-filter.
    pub combinations_skipped: usize,
    /// Combinations whose routing or pricing failed.
    pub combinations_failed: usize,
    /// Segmentation plans attempted.
    pub segment_plans_tried: usize,
    /// Requests sent to the routing engine, base route included.
    pub route_requests: usize,
    /// Cost cache counters at the end of the session.
    pub cache: CacheStats,
    /// Wall-clock session time.
    #[serde(with = "crate::serde_secs")]
    pub elapsed: Duration,
    /// State the machine finished in.
    pub final_state: SearchState,
    /// True when the session deadline expired.
    pub timed_out: bool,
}

impl Default for OptimizationStats {
    fn default() -> Self {
        Self {
            combinations_generated: 0,
            combinations_tested: 0,
            combinations_skipped: 0,
            combinations_failed: 0,
            segment_plans_tried: 0,
            route_requests: 0,
            cache: CacheStats::default(),
            elapsed: Duration::ZERO,
            final_state: SearchState::Done,
            timed_out: false,
        }
    }
}

/// Final answer of an optimisation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Quickest route.
    pub fastest: Option<Leader>,
    /// Cheapest route.
    pub cheapest: Option<Leader>,
    /// Route with the fewest tolls.
    pub min_tolls: Option<Leader>,
    /// Outcome classification.
    pub status: OptimizationStatus,
    /// Session counters.
    pub stats: OptimizationStats,
}

impl OptimizationResult {
    /// Leaders that are present, in fastest, cheapest, fewest-tolls order.
    pub fn leaders(&self) -> impl Iterator<Item = &Leader> {
        [&self.fastest, &self.cheapest, &self.min_tolls]
            .into_iter()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(OptimizationStatus::ClosestToBudgetFound)]
    #[case(OptimizationStatus::NoValidRouteWithMaxTolls)]
    #[case(OptimizationStatus::BudgetZeroNoTollSuccess)]
    fn serde_label_matches_display(#[case] status: OptimizationStatus) {
        let json = serde_json::to_string(&status).expect("serialise");
        assert_eq!(json, format!("\"{status}\""));
    }

    #[rstest]
    fn relaxed_statuses_are_not_strict_successes() {
        assert!(!OptimizationStatus::RelaxedTollLimitSatisfied.is_strict_success());
        assert!(!OptimizationStatus::ClosestToBudgetFound.is_strict_success());
        assert!(OptimizationStatus::BudgetSatisfied.is_strict_success());
    }
}
