//! Relaxed limits tried once the strict search fails.

use tollgate_core::{Constraint, Cost, Limit};

use crate::SolverConfig;

/// Relaxed limits in the order they are tried.
///
/// A toll count relaxes by one toll, an absolute budget by the configured
/// tolerance, and a percentage budget by each configured escalation factor
/// in turn. Zero limits are dropped: anything meeting them would already
/// have met the strict limit.
#[must_use]
pub fn relaxed_limits(constraint: &Constraint, base_cost: Cost, config: &SolverConfig) -> Vec<Limit> {
    let limits = match *constraint {
        Constraint::MaxTollCount(max) => vec![Limit::Count(max.saturating_add(1))],
        Constraint::MaxBudgetAbsolute(budget) => {
            vec![Limit::Budget(budget.scale_down(widen(config.absolute_backup_tolerance)))]
        }
        Constraint::MaxBudgetPercentage(share) => config
            .percentage_escalation
            .iter()
            .map(|factor| Limit::Budget(base_cost.scale_down(product(share, *factor))))
            .collect(),
    };
    limits.into_iter().filter(|limit| !limit.is_zero()).collect()
}

#[expect(clippy::float_arithmetic, reason = "tolerance widens the budget")]
fn widen(tolerance: f64) -> f64 {
    1.0 + tolerance
}

#[expect(clippy::float_arithmetic, reason = "escalation scales the share")]
fn product(share: f64, factor: f64) -> f64 {
    share * factor
}
