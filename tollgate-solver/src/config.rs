//! Tunable thresholds for the search.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for [`ConstraintResolver`](crate::ConstraintResolver).
///
/// Every field has a documented default; a partial configuration file
/// deserialises onto those defaults.
///
/// # Examples
///
/// ```
/// use tollgate_solver::SolverConfig;
///
/// let config: SolverConfig = serde_json::from_str(r#"{"parallelism": 4}"#)?;
/// assert_eq!(config.parallelism, 4);
/// assert_eq!(config.candidate_pool_size, 10);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Number of costliest tolls considered for avoidance.
    pub candidate_pool_size: usize,
    /// Budget mode skips a combination whose estimated saving is below this
    /// share of the remaining gap to the limit.
    pub prefilter_fraction: f64,
    /// Hard ceiling on combinations tested per search.
    pub max_combinations: usize,
    /// Report progress every this many combinations.
    pub progress_interval: usize,
    /// Worker threads used to evaluate combinations; `1` evaluates inline.
    pub parallelism: usize,
    /// Wall-clock ceiling for one session, in seconds.
    pub session_timeout_secs: u64,
    /// Distance within which a toll counts as lying on a route, in metres.
    pub toll_buffer_m: f64,
    /// Absolute budgets accept routes up to this share above the budget
    /// once the strict search fails.
    pub absolute_backup_tolerance: f64,
    /// Successive multipliers applied to a percentage budget once the strict
    /// search fails.
    pub percentage_escalation: Vec<f64>,
    /// Maximum segmentation plans attempted per search.
    pub max_segment_plans: usize,
    /// Largest gap tolerated between consecutive route segments, in metres.
    pub continuity_tolerance_m: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            candidate_pool_size: 10,
            prefilter_fraction: 0.05,
            max_combinations: 1_000,
            progress_interval: 50,
            parallelism: 1,
            session_timeout_secs: 60,
            toll_buffer_m: 120.0,
            absolute_backup_tolerance: 0.20,
            percentage_escalation: vec![1.10, 1.25, 1.50],
            max_segment_plans: 10,
            continuity_tolerance_m: 50.0,
        }
    }
}

/// A configuration value outside its accepted range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid solver configuration: {field} {reason}")]
pub struct SolverConfigError {
    /// Offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub reason: &'static str,
}

impl SolverConfig {
    /// Session deadline as a [`Duration`].
    #[must_use]
    pub const fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range field.
    pub fn validate(&self) -> Result<(), SolverConfigError> {
        let fail = |field, reason| Err(SolverConfigError { field, reason });
        if self.candidate_pool_size == 0 {
            return fail("candidate_pool_size", "must be at least 1");
        }
        if self.parallelism == 0 {
            return fail("parallelism", "must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.prefilter_fraction) {
            return fail("prefilter_fraction", "must lie within [0, 1]");
        }
        if !self.absolute_backup_tolerance.is_finite() || self.absolute_backup_tolerance < 0.0 {
            return fail("absolute_backup_tolerance", "must be finite and non-negative");
        }
        if self
            .percentage_escalation
            .iter()
            .any(|factor| !factor.is_finite() || *factor < 1.0)
        {
            return fail("percentage_escalation", "factors must be finite and at least 1");
        }
        if !self.toll_buffer_m.is_finite() || self.toll_buffer_m <= 0.0 {
            return fail("toll_buffer_m", "must be finite and positive");
        }
        if !self.continuity_tolerance_m.is_finite() || self.continuity_tolerance_m < 0.0 {
            return fail("continuity_tolerance_m", "must be finite and non-negative");
        }
        Ok(())
    }
}
