//! The [`ConstraintResolver`] facade and the session flow behind it.

use std::sync::Arc;

use log::{info, warn};
use tollgate_core::{
    AvoidDirective, AvoidanceZoneBuilder, BufferZoneBuilder, ComplianceTier, ConstraintMode, Limit,
    LogTelemetry, OptimizationResult, OptimizationStats, OptimizationStatus, OptimizeError,
    OptimizeRequest, Optimizer, PricingService, RouteAttempt, RouteProvider, SearchState,
    SequenceCostCache, Telemetry, TelemetryEvent, TollCandidate, TollCatalog,
};

use crate::aggregator::ResultAggregator;
use crate::combination::{
    Combination, CombinationSearch, Flow, Prefilter, SearchReport, generate_combinations,
    rank_candidates,
};
use crate::costing::RouteCoster;
use crate::fallback::{FallbackController, TierOutcome};
use crate::segmentation::SegmentationPlanner;
use crate::session::Session;
use crate::tiers::relaxed_limits;
use crate::{SolverConfig, SolverConfigError};

/// Finds routes meeting a toll constraint by asking the routing engine to
/// avoid chosen tolls, falling back through relaxed limits to the base
/// route.
///
/// The resolver is immutable and `Send + Sync`; concurrent sessions share
/// its collaborators and the [`SequenceCostCache`].
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use tollgate_core::test_support::CorridorWorld;
/// use tollgate_core::{Constraint, OptimizationStatus, OptimizeRequest, Optimizer, TollSystem};
/// use tollgate_solver::ConstraintResolver;
///
/// let world = CorridorWorld::new().with_toll("T1", 0.5, TollSystem::Open, 400);
/// let request = OptimizeRequest::new(world.endpoints().to_vec(), Constraint::MaxTollCount(0));
/// let resolver = ConstraintResolver::new(&world, &world, &world);
///
/// let result = resolver.optimize(&request)?;
/// assert_eq!(result.status, OptimizationStatus::NoTollSuccess);
/// # Ok::<(), tollgate_core::OptimizeError>(())
/// ```
pub struct ConstraintResolver<R, C, P> {
    provider: R,
    catalog: C,
    pricing: P,
    cache: Arc<SequenceCostCache>,
    telemetry: Arc<dyn Telemetry>,
    zones: Arc<dyn AvoidanceZoneBuilder>,
    config: SolverConfig,
}

impl<R, C, P> ConstraintResolver<R, C, P>
where
    R: RouteProvider,
    C: TollCatalog,
    P: PricingService,
{
    /// Resolver with default configuration, a private cache, logging
    /// telemetry and disc-shaped avoidance zones.
    pub fn new(provider: R, catalog: C, pricing: P) -> Self {
        Self {
            provider,
            catalog,
            pricing,
            cache: Arc::new(SequenceCostCache::default()),
            telemetry: Arc::new(LogTelemetry),
            zones: Arc::new(BufferZoneBuilder::default()),
            config: SolverConfig::default(),
        }
    }

    /// Replace the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SolverConfigError`] when a value is out of range.
    pub fn with_config(mut self, config: SolverConfig) -> Result<Self, SolverConfigError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Share a cost cache with other resolvers.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<SequenceCostCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Send telemetry to `telemetry`.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Build avoidance directives with `zones`.
    #[must_use]
    pub fn with_zone_builder(mut self, zones: Arc<dyn AvoidanceZoneBuilder>) -> Self {
        self.zones = zones;
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// The shared cost cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<SequenceCostCache> {
        &self.cache
    }
}

impl<R, C, P> Optimizer for ConstraintResolver<R, C, P>
where
    R: RouteProvider,
    C: TollCatalog,
    P: PricingService,
{
    fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizationResult, OptimizeError> {
        request.validate()?;
        let coster = RouteCoster::new(
            &self.catalog,
            &self.pricing,
            &self.cache,
            request.vehicle_class,
            self.config.toll_buffer_m,
        );
        let session = Session::new(
            &self.provider,
            coster,
            self.zones.as_ref(),
            self.telemetry.as_ref(),
            &self.config,
            &request.coordinates,
        );
        let base = base_route(&session)?;
        let limit = request.constraint.resolve(base.total_cost);
        info!(
            "optimising {} waypoints for {limit}: base route has {} tolls costing {}",
            request.coordinates.len(),
            base.toll_count,
            base.total_cost
        );
        self.telemetry.record(TelemetryEvent::SessionStarted {
            limit,
            base_toll_count: base.toll_count,
            base_cost: base.total_cost,
        });

        let run = SessionRun::new(
            &session,
            request,
            base,
            limit,
            FallbackController::new(Arc::clone(&self.telemetry)),
        );
        let mut result = run.execute();
        result.stats.cache = self.cache.stats();
        self.telemetry
            .record(TelemetryEvent::CacheSnapshot(result.stats.cache));
        self.telemetry.record(TelemetryEvent::SessionFinished {
            status: result.status,
            elapsed: result.stats.elapsed,
        });
        info!(
            "session finished with {} after {} route requests",
            result.status, result.stats.route_requests
        );
        Ok(result)
    }
}

impl<R, C, P> std::fmt::Debug for ConstraintResolver<R, C, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn base_route(session: &Session<'_>) -> Result<RouteAttempt, OptimizeError> {
    let plan = session
        .route(session.waypoints, &AvoidDirective::None)
        .map_err(|err| {
            if err.is_no_route() {
                OptimizeError::Infeasible(err.to_string())
            } else {
                OptimizeError::BaseRouteUnavailable(err)
            }
        })?;
    Ok(session.coster.assess_lenient(session.waypoints, plan))
}

/// Grades attempts against the strict limit and every relaxed limit.
struct Grader {
    limit: Limit,
    strict: ResultAggregator,
    rungs: Vec<(Limit, ResultAggregator)>,
    attempts: usize,
}

impl Grader {
    fn new(limit: Limit, relaxed: Vec<Limit>) -> Self {
        Self {
            limit,
            strict: ResultAggregator::default(),
            rungs: relaxed
                .into_iter()
                .map(|rung| (rung, ResultAggregator::default()))
                .collect(),
            attempts: 0,
        }
    }

    /// Strict grading. Stops the search once a compliant toll-free route
    /// turns up.
    fn grade(&mut self, attempt: RouteAttempt) -> Flow {
        self.attempts = self.attempts.saturating_add(1);
        if attempt.complies_with(&self.limit) {
            let free = attempt.total_cost.is_zero();
            self.strict.update(attempt, ComplianceTier::Strict);
            return if free { Flow::Stop } else { Flow::Continue };
        }
        self.offer_relaxed(&attempt);
        Flow::Continue
    }

    /// Relaxed-only grading.
    fn grade_relaxed(&mut self, attempt: RouteAttempt) -> Flow {
        self.attempts = self.attempts.saturating_add(1);
        self.offer_relaxed(&attempt);
        Flow::Continue
    }

    fn offer_relaxed(&mut self, attempt: &RouteAttempt) {
        for (rung, aggregator) in &mut self.rungs {
            if attempt.complies_with(rung) {
                aggregator.update(attempt.clone(), ComplianceTier::Relaxed);
            }
        }
    }

    fn has_strict(&self) -> bool {
        !self.strict.is_empty(ComplianceTier::Strict)
    }
}

/// One session's walk through the fallback tiers.
struct SessionRun<'s, 'a> {
    session: &'s Session<'a>,
    mode: ConstraintMode,
    max_comb_size: usize,
    base: RouteAttempt,
    limit: Limit,
    grader: Grader,
    search: CombinationSearch,
    combinations: Option<(Vec<TollCandidate>, Vec<Combination>)>,
    controller: FallbackController,
    stats: OptimizationStats,
}

impl<'s, 'a> SessionRun<'s, 'a> {
    fn new(
        session: &'s Session<'a>,
        request: &OptimizeRequest,
        base: RouteAttempt,
        limit: Limit,
        controller: FallbackController,
    ) -> Self {
        let relaxed = relaxed_limits(&request.constraint, base.total_cost, session.config);
        Self {
            session,
            mode: request.constraint.mode(),
            max_comb_size: request.max_comb_size,
            grader: Grader::new(limit, relaxed),
            search: CombinationSearch::new(session.config.parallelism),
            combinations: None,
            controller,
            stats: OptimizationStats::default(),
            base,
            limit,
        }
    }

    fn execute(mut self) -> OptimizationResult {
        if self.base.complies_with(&self.limit) {
            let base = self.base.clone();
            self.grader.grade(base);
            self.controller.advance(TierOutcome::Compliant, self.grader.attempts);
            let strict = self.grader.strict.clone();
            return self.finish(&strict, OptimizationStatus::AlreadySatisfied);
        }

        let (outcome, forced) = if self.limit.is_zero() {
            self.avoid_everything()
        } else {
            (self.priority_one(), None)
        };
        if outcome == TierOutcome::Compliant {
            self.controller.advance(outcome, self.grader.attempts);
            let strict = self.grader.strict.clone();
            let status = self.strict_status();
            return self.finish(&strict, status);
        }

        let mut timed_out = outcome == TierOutcome::TimedOut;
        let next = self.controller.advance(outcome, self.grader.attempts);
        if next == SearchState::Priority2Backup && forced.is_some() {
            self.controller
                .advance(TierOutcome::Exhausted, self.grader.attempts);
        } else if next == SearchState::Priority2Backup {
            let base = self.base.clone();
            self.grader.grade_relaxed(base);
            match self.priority_two() {
                Some(rung) => {
                    self.controller
                        .advance(TierOutcome::Compliant, self.grader.attempts);
                    let status = match self.mode {
                        ConstraintMode::TollCount => OptimizationStatus::RelaxedTollLimitSatisfied,
                        ConstraintMode::AbsoluteBudget | ConstraintMode::PercentageBudget => {
                            OptimizationStatus::ClosestToBudgetFound
                        }
                    };
                    return self.finish(&rung, status);
                }
                None => {
                    timed_out = self.session.expired();
                    let next = if timed_out {
                        TierOutcome::TimedOut
                    } else {
                        TierOutcome::Exhausted
                    };
                    self.controller.advance(next, self.grader.attempts);
                }
            }
        }

        let status = if forced.is_some() {
            OptimizationStatus::SomeTollsPresent
        } else if timed_out {
            OptimizationStatus::SessionTimeout
        } else if self.limit.is_zero() {
            OptimizationStatus::SomeTollsPresent
        } else if self.mode == ConstraintMode::TollCount {
            OptimizationStatus::NoValidRouteWithMaxTolls
        } else {
            OptimizationStatus::NoRouteWithinBudget
        };
        self.stats.timed_out = timed_out;
        let mut baseline = ResultAggregator::default();
        baseline.update(forced.unwrap_or_else(|| self.base.clone()), ComplianceTier::Baseline);
        self.controller
            .advance(TierOutcome::Exhausted, self.grader.attempts);
        self.finish(&baseline, status)
    }

    /// Zero limits: ask the engine to avoid every tollway in one request.
    /// Returns the forced route when it still crosses tolls; its tolls are
    /// unavoidable and the session reports them without a relaxed search.
    fn avoid_everything(&mut self) -> (TierOutcome, Option<RouteAttempt>) {
        let waypoints = self.session.waypoints;
        let forced = self
            .session
            .route(waypoints, &AvoidDirective::AllTollways)
            .map_err(|err| err.to_string())
            .and_then(|plan| {
                self.session
                    .coster
                    .assess(waypoints, plan)
                    .map_err(|err| err.to_string())
            });
        match forced {
            Ok(attempt) if attempt.complies_with(&self.limit) => {
                self.grader.grade(attempt);
                (TierOutcome::Compliant, None)
            }
            Ok(attempt) => {
                info!(
                    "toll-free route unavailable: {} tolls remain",
                    attempt.toll_count
                );
                self.grader.grade(attempt.clone());
                (self.exhausted_or_timed_out(), Some(attempt))
            }
            Err(message) => {
                warn!("toll-free route request failed: {message}");
                (self.exhausted_or_timed_out(), None)
            }
        }
    }

    /// Strict search: combinations first, then segmentation.
    fn priority_one(&mut self) -> TierOutcome {
        let (ranked, combinations) = self.combinations();
        let prefilter = self.prefilter(self.limit);
        let grader = &mut self.grader;
        let report = self
            .search
            .run(self.session, &combinations, prefilter, |attempt| grader.grade(attempt));
        self.absorb(report);

        if !self.grader.has_strict() && !report.timed_out {
            let grader = &mut self.grader;
            let segments = SegmentationPlanner::new(self.session).run(
                &self.base,
                &self.limit,
                &ranked,
                self.max_comb_size,
                |attempt| grader.grade(attempt),
            );
            self.stats.segment_plans_tried = self
                .stats
                .segment_plans_tried
                .saturating_add(segments.tried);
            if segments.timed_out {
                self.stats.timed_out = true;
            }
        }

        if self.grader.has_strict() {
            TierOutcome::Compliant
        } else {
            self.exhausted_or_timed_out()
        }
    }

    /// Relaxed search: the first relaxed limit with a result wins. Attempts
    /// graded during the strict search already count; only combinations not
    /// yet routed are evaluated.
    fn priority_two(&mut self) -> Option<ResultAggregator> {
        let (_, combinations) = self.combinations();
        for index in 0..self.grader.rungs.len() {
            let Some((rung, aggregator)) = self.grader.rungs.get(index) else {
                break;
            };
            if !aggregator.is_empty(ComplianceTier::Relaxed) {
                return Some(aggregator.clone());
            }
            if self.session.expired() {
                return None;
            }
            let prefilter = self.prefilter(*rung);
            let grader = &mut self.grader;
            let report = self.search.run(self.session, &combinations, prefilter, |attempt| {
                grader.grade_relaxed(attempt)
            });
            self.absorb(report);
            if let Some((_, found)) = self.grader.rungs.get(index) {
                if !found.is_empty(ComplianceTier::Relaxed) {
                    return Some(found.clone());
                }
            }
        }
        None
    }

    /// Ranked candidates and their combinations, generated once per session.
    fn combinations(&mut self) -> (Vec<TollCandidate>, Vec<Combination>) {
        if let Some(generated) = &self.combinations {
            return generated.clone();
        }
        let ranked = rank_candidates(&self.base.tolls, self.session.config.candidate_pool_size);
        let combinations = generate_combinations(&ranked, self.max_comb_size);
        self.stats.combinations_generated = combinations.len();
        self.combinations = Some((ranked.clone(), combinations.clone()));
        (ranked, combinations)
    }

    fn prefilter(&self, limit: Limit) -> Option<Prefilter> {
        match limit {
            Limit::Budget(budget) => Some(Prefilter::new(
                budget,
                self.base.total_cost,
                self.session.config.prefilter_fraction,
            )),
            Limit::Count(_) => None,
        }
    }

    fn absorb(&mut self, report: SearchReport) {
        let stats = &mut self.stats;
        stats.combinations_tested = stats.combinations_tested.saturating_add(report.tested);
        stats.combinations_skipped = stats.combinations_skipped.saturating_add(report.skipped);
        stats.combinations_failed = stats.combinations_failed.saturating_add(report.failed);
        stats.timed_out |= report.timed_out;
    }

    fn exhausted_or_timed_out(&self) -> TierOutcome {
        if self.stats.timed_out || self.session.expired() {
            TierOutcome::TimedOut
        } else {
            TierOutcome::Exhausted
        }
    }

    fn strict_status(&self) -> OptimizationStatus {
        match (self.mode, self.limit.is_zero()) {
            (ConstraintMode::TollCount, true) => OptimizationStatus::NoTollSuccess,
            (ConstraintMode::TollCount, false) => OptimizationStatus::TollLimitSatisfied,
            (_, true) => OptimizationStatus::BudgetZeroNoTollSuccess,
            (_, false) => OptimizationStatus::BudgetSatisfied,
        }
    }

    fn finish(mut self, leaders: &ResultAggregator, status: OptimizationStatus) -> OptimizationResult {
        let snapshot = leaders.finalize();
        self.stats.route_requests = self.session.route_requests();
        self.stats.elapsed = self.session.elapsed();
        self.stats.final_state = self.controller.state();
        OptimizationResult {
            fastest: snapshot.as_ref().map(|leaders| leaders.fastest.clone()),
            cheapest: snapshot.as_ref().map(|leaders| leaders.cheapest.clone()),
            min_tolls: snapshot.map(|leaders| leaders.min_tolls),
            status,
            stats: self.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tollgate_core::test_support::CorridorWorld;
    use tollgate_core::{Cost, TollSystem};

    use super::*;

    fn resolver(world: &CorridorWorld) -> ConstraintResolver<&CorridorWorld, &CorridorWorld, &CorridorWorld> {
        ConstraintResolver::new(world, world, world)
    }

    #[rstest]
    fn rejects_invalid_configuration() {
        let world = CorridorWorld::new();
        let config = SolverConfig {
            parallelism: 0,
            ..SolverConfig::default()
        };
        assert!(resolver(&world).with_config(config).is_err());
    }

    #[rstest]
    fn grader_feeds_every_satisfied_rung() {
        let mut grader = Grader::new(
            Limit::Budget(Cost::from_cents(1_000)),
            vec![
                Limit::Budget(Cost::from_cents(1_100)),
                Limit::Budget(Cost::from_cents(1_500)),
            ],
        );
        let world = CorridorWorld::new().with_toll("T", 0.5, TollSystem::Open, 1_200);
        let plan = world
            .get_route(&world.endpoints(), &AvoidDirective::None)
            .expect("route");
        let attempt = RouteAttempt::from_plan(
            world.endpoints().to_vec(),
            plan,
            Vec::new(),
            Cost::from_cents(1_200),
        );
        assert_eq!(grader.grade(attempt), Flow::Continue);
        assert!(!grader.has_strict());
        let filled: Vec<bool> = grader
            .rungs
            .iter()
            .map(|(_, aggregator)| !aggregator.is_empty(ComplianceTier::Relaxed))
            .collect();
        assert_eq!(filled, [false, true]);
    }

    #[rstest]
    fn free_compliant_attempt_stops_the_search() {
        let mut grader = Grader::new(Limit::Count(0), vec![Limit::Count(1)]);
        let world = CorridorWorld::new();
        let plan = world
            .get_route(&world.endpoints(), &AvoidDirective::None)
            .expect("route");
        let attempt =
            RouteAttempt::from_plan(world.endpoints().to_vec(), plan, Vec::new(), Cost::ZERO);
        assert_eq!(grader.grade(attempt), Flow::Stop);
        assert!(grader.has_strict());
    }
}
