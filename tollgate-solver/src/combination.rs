//! Candidate ranking, combination generation and the batched combination
//! search.
//!
//! The search walks combinations in generation order (ascending size, then
//! descending estimated saving) and evaluates them in batches. A batch is
//! routed in parallel on a dedicated rayon pool when `parallelism > 1`, but
//! its results are always handed to the caller in generation order, so the
//! leaders a session produces do not depend on thread scheduling.

use std::collections::HashSet;

use log::{debug, warn};
use rayon::prelude::*;
use thiserror::Error;
use tollgate_core::{
    Cost, PricingError, RouteAttempt, RouteError, TelemetryEvent, TollCandidate, TollId,
};

use crate::session::Session;

/// A set of tolls to avoid together.
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    /// Sorted toll identifiers; unique per combination.
    pub signature: Vec<TollId>,
    /// Member tolls in ranking order.
    pub tolls: Vec<TollCandidate>,
    /// Sum of the members' individual costs.
    pub estimated_saving: Cost,
}

impl Combination {
    fn from_members(tolls: Vec<TollCandidate>) -> Self {
        let mut signature: Vec<TollId> = tolls.iter().map(|toll| toll.id.clone()).collect();
        signature.sort();
        let estimated_saving = tolls.iter().map(|toll| toll.cost).sum();
        Self {
            signature,
            tolls,
            estimated_saving,
        }
    }

    /// Number of tolls in the combination.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tolls.len()
    }

    /// True for the empty combination.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tolls.is_empty()
    }
}

/// The `pool_size` costliest tolls, ties broken by route position.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use tollgate_core::{Cost, TollCandidate, TollSystem};
/// use tollgate_solver::rank_candidates;
///
/// let toll = |id: &str, index: usize, cents: u64| {
///     let mut toll = TollCandidate::new(id, Coord { x: 0.0, y: 0.0 }, "op", TollSystem::Open);
///     toll.route_index = index;
///     toll.cost = Cost::from_cents(cents);
///     toll
/// };
/// let ranked = rank_candidates(&[toll("A", 0, 300), toll("B", 1, 800), toll("C", 2, 300)], 2);
/// let ids: Vec<_> = ranked.iter().map(|toll| toll.id.as_str()).collect();
/// assert_eq!(ids, ["B", "A"]);
/// ```
#[must_use]
pub fn rank_candidates(tolls: &[TollCandidate], pool_size: usize) -> Vec<TollCandidate> {
    let mut ranked = tolls.to_vec();
    ranked.sort_by(|a, b| {
        b.cost
            .cmp(&a.cost)
            .then_with(|| a.route_index.cmp(&b.route_index))
    });
    ranked.truncate(pool_size);
    ranked
}

/// Every combination of exactly `size` distinct tolls from `ranked`,
/// sorted by estimated saving, largest first. Ties keep lexicographic
/// ranking order.
#[must_use]
pub fn combinations_of_size(ranked: &[TollCandidate], size: usize) -> Vec<Combination> {
    if size == 0 || size > ranked.len() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut current = Vec::with_capacity(size);
    choose(ranked, size, 0, &mut current, &mut out);
    let mut seen = HashSet::new();
    out.retain(|combination: &Combination| {
        let distinct: HashSet<&TollId> = combination.signature.iter().collect();
        distinct.len() == combination.signature.len() && seen.insert(combination.signature.clone())
    });
    out.sort_by(|a, b| b.estimated_saving.cmp(&a.estimated_saving));
    out
}

fn choose(
    ranked: &[TollCandidate],
    size: usize,
    start: usize,
    current: &mut Vec<usize>,
    out: &mut Vec<Combination>,
) {
    if current.len() == size {
        let members = current
            .iter()
            .filter_map(|index| ranked.get(*index).cloned())
            .collect();
        out.push(Combination::from_members(members));
        return;
    }
    for index in start..ranked.len() {
        current.push(index);
        choose(ranked, size, index.saturating_add(1), current, out);
        current.pop();
    }
}

/// Combinations of sizes `1..=max_size`, smallest sizes first, each
/// signature appearing once.
#[must_use]
pub fn generate_combinations(ranked: &[TollCandidate], max_size: usize) -> Vec<Combination> {
    let mut seen = HashSet::new();
    (1..=max_size.min(ranked.len()))
        .flat_map(|size| combinations_of_size(ranked, size))
        .filter(|combination| seen.insert(combination.signature.clone()))
        .collect()
}

/// Why a combination could not be turned into an attempt.
#[derive(Debug, Error)]
pub(crate) enum EvaluationError {
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Whether the search should keep going after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Stop,
}

/// Budget-mode pre-filter: drop combinations whose estimated saving is
/// below a fraction of the gap between the cheapest cost seen and the
/// limit.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Prefilter {
    limit: Cost,
    lowest: Cost,
    fraction: f64,
}

impl Prefilter {
    pub(crate) const fn new(limit: Cost, base_cost: Cost, fraction: f64) -> Self {
        Self {
            limit,
            lowest: base_cost,
            fraction,
        }
    }

    fn admits(&self, combination: &Combination) -> bool {
        let gap = self.lowest.saturating_sub(self.limit);
        combination.estimated_saving >= gap.scale(self.fraction)
    }

    fn observe(&mut self, cost: Cost) {
        self.lowest = self.lowest.min(cost);
    }
}

/// Counters from one or more search runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SearchReport {
    pub(crate) generated: usize,
    pub(crate) tested: usize,
    pub(crate) skipped: usize,
    pub(crate) failed: usize,
    pub(crate) timed_out: bool,
    pub(crate) stopped: bool,
}

/// Evaluates combinations, remembering signatures already routed so later
/// tiers do not repeat requests.
pub(crate) struct CombinationSearch {
    seen: HashSet<Vec<TollId>>,
    pool: Option<rayon::ThreadPool>,
    batch: usize,
}

impl CombinationSearch {
    pub(crate) fn new(parallelism: usize) -> Self {
        let pool = (parallelism > 1)
            .then(|| {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(parallelism)
                    .thread_name(|index| format!("tollgate-search-{index}"))
                    .build()
                    .map_err(|err| warn!("falling back to sequential search: {err}"))
                    .ok()
            })
            .flatten();
        let batch = if pool.is_some() { parallelism } else { 1 };
        Self {
            seen: HashSet::new(),
            pool,
            batch,
        }
    }

    /// Evaluate `combinations` in order, passing every successful attempt to
    /// `on_attempt` until it asks to stop, the session ceiling is reached or
    /// the deadline expires.
    pub(crate) fn run<F>(
        &mut self,
        session: &Session<'_>,
        combinations: &[Combination],
        mut prefilter: Option<Prefilter>,
        mut on_attempt: F,
    ) -> SearchReport
    where
        F: FnMut(RouteAttempt) -> Flow,
    {
        let mut report = SearchReport {
            generated: combinations.len(),
            ..SearchReport::default()
        };
        let mut pending = combinations
            .iter()
            .filter(|combination| !self.seen.contains(&combination.signature))
            .collect::<Vec<_>>()
            .into_iter()
            .peekable();
        let mut since_progress = 0_usize;

        while pending.peek().is_some() {
            if session.expired() {
                report.timed_out = true;
                break;
            }
            let capacity = session.remaining_combinations().min(self.batch);
            if capacity == 0 {
                debug!("combination ceiling reached after {} tests", session.tested());
                break;
            }
            let mut batch = Vec::with_capacity(capacity);
            while batch.len() < capacity {
                let Some(combination) = pending.next() else {
                    break;
                };
                if prefilter.is_some_and(|filter| !filter.admits(combination)) {
                    report.skipped = report.skipped.saturating_add(1);
                    continue;
                }
                batch.push(combination);
            }
            if batch.is_empty() {
                continue;
            }

            let results = self.evaluate_batch(session, &batch);
            session.record_tested(batch.len());
            report.tested = report.tested.saturating_add(batch.len());
            since_progress = since_progress.saturating_add(batch.len());

            for (combination, result) in batch.into_iter().zip(results) {
                self.seen.insert(combination.signature.clone());
                if report.stopped {
                    continue;
                }
                match result {
                    Ok(attempt) => {
                        if let Some(filter) = prefilter.as_mut() {
                            filter.observe(attempt.total_cost);
                        }
                        if on_attempt(attempt) == Flow::Stop {
                            report.stopped = true;
                        }
                    }
                    Err(err) => {
                        report.failed = report.failed.saturating_add(1);
                        debug!("combination {:?} failed: {err}", combination.signature);
                        session.telemetry.record(TelemetryEvent::CombinationSkipped {
                            signature: combination.signature.clone(),
                            reason: err.to_string(),
                        });
                    }
                }
            }

            if since_progress >= session.config.progress_interval.max(1) {
                since_progress = 0;
                session.telemetry.record(TelemetryEvent::SearchProgress {
                    tested: report.tested,
                    generated: report.generated,
                    elapsed: session.elapsed(),
                });
            }
            if report.stopped {
                break;
            }
        }
        report
    }

    fn evaluate_batch(
        &self,
        session: &Session<'_>,
        batch: &[&Combination],
    ) -> Vec<Result<RouteAttempt, EvaluationError>> {
        match &self.pool {
            Some(pool) => pool.install(|| {
                batch
                    .par_iter()
                    .map(|combination| evaluate(session, combination))
                    .collect()
            }),
            None => batch
                .iter()
                .map(|combination| evaluate(session, combination))
                .collect(),
        }
    }
}

fn evaluate(
    session: &Session<'_>,
    combination: &Combination,
) -> Result<RouteAttempt, EvaluationError> {
    let directive = session.zones.build(&combination.tolls);
    let plan = session.route(session.waypoints, &directive)?;
    let attempt = session.coster.assess(session.waypoints, plan)?;
    Ok(attempt.with_avoided(combination.signature.clone()))
}
