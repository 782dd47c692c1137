//! Behavioural tests for `ConstraintResolver` using rstest-bdd.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tollgate_core::test_support::CorridorWorld;
use tollgate_core::{
    Constraint, Cost, OptimizationResult, OptimizeError, OptimizeRequest, Optimizer, TollId,
    TollSystem,
};
use tollgate_solver::{ConstraintResolver, SolverConfig};

#[derive(Debug, Default)]
struct ResolverWorld {
    corridor: RefCell<CorridorWorld>,
    config: RefCell<SolverConfig>,
    outcome: RefCell<Option<Result<OptimizationResult, OptimizeError>>>,
}

impl ResolverWorld {
    fn add_toll(&self, id: &str, x: f64, system: TollSystem, cents: u64) {
        let corridor = self.corridor.take();
        self.corridor
            .replace(corridor.with_toll(id.trim_matches('"'), x, system, cents));
    }

    fn optimise(&self, constraint: Constraint) {
        let corridor = self.corridor.borrow();
        let outcome = ConstraintResolver::new(&*corridor, &*corridor, &*corridor)
            .with_config(self.config.borrow().clone())
            .map_err(|err| OptimizeError::Infeasible(err.to_string()))
            .and_then(|resolver| {
                resolver.optimize(&OptimizeRequest::new(
                    corridor.endpoints().to_vec(),
                    constraint,
                ))
            });
        self.outcome.replace(Some(outcome));
    }

    #[expect(
        clippy::expect_used,
        reason = "behaviour tests use expect for readable failures"
    )]
    fn result(&self) -> OptimizationResult {
        self.outcome
            .borrow()
            .clone()
            .expect("outcome should be recorded before assertions")
            .expect("optimisation should succeed")
    }
}

#[fixture]
fn world() -> ResolverWorld {
    ResolverWorld::default()
}

#[given("a closed toll {id} at longitude {x} costing {cents} cents")]
fn given_closed_toll(world: &ResolverWorld, id: String, x: f64, cents: u64) {
    world.add_toll(&id, x, TollSystem::Closed, cents);
}

#[given("an open toll {id} at longitude {x} costing {cents} cents")]
fn given_open_toll(world: &ResolverWorld, id: String, x: f64, cents: u64) {
    world.add_toll(&id, x, TollSystem::Open, cents);
}

#[given("toll {id} cannot be avoided")]
fn given_unavoidable(world: &ResolverWorld, id: String) {
    let corridor = world.corridor.take();
    world
        .corridor
        .replace(corridor.with_unavoidable(id.trim_matches('"')));
}

#[given("a session timeout of {secs} seconds")]
fn given_timeout(world: &ResolverWorld, secs: u64) {
    world.config.borrow_mut().session_timeout_secs = secs;
}

#[when("the route is optimised for at most {count} tolls")]
fn when_toll_limit(world: &ResolverWorld, count: u32) {
    world.optimise(Constraint::MaxTollCount(count));
}

#[when("the route is optimised for a budget of {cents} cents")]
fn when_budget(world: &ResolverWorld, cents: u64) {
    world.optimise(Constraint::MaxBudgetAbsolute(Cost::from_cents(cents)));
}

#[when("the route is optimised for a budget share of {share}")]
fn when_budget_share(world: &ResolverWorld, share: f64) {
    world.optimise(Constraint::MaxBudgetPercentage(share));
}

#[then("the status is {status}")]
fn then_status(world: &ResolverWorld, status: String) {
    assert_eq!(world.result().status.as_str(), status.trim_matches('"'));
}

#[then("the first avoided toll sets are {sets}")]
fn then_avoided_sets(world: &ResolverWorld, sets: String) {
    let expected: Vec<Vec<TollId>> = sets
        .trim_matches('"')
        .split(';')
        .map(|set| set.split(',').map(|id| TollId::from(id.trim())).collect())
        .collect();
    let observed = world.corridor.borrow().avoided_sets();
    let head: Vec<_> = observed.into_iter().take(expected.len()).collect();
    assert_eq!(head, expected);
}

#[then("the cheapest route costs {cents} cents")]
fn then_cheapest(world: &ResolverWorld, cents: u64) {
    let cheapest = world.result().cheapest.map(|leader| leader.attempt.total_cost);
    assert_eq!(cheapest, Some(Cost::from_cents(cents)));
}

#[then("every leader costs {cents} cents")]
fn then_every_leader_costs(world: &ResolverWorld, cents: u64) {
    let result = world.result();
    assert_eq!(result.leaders().count(), 3);
    for leader in result.leaders() {
        assert_eq!(leader.attempt.total_cost, Cost::from_cents(cents));
    }
}

#[then("every leader is compliant")]
fn then_all_compliant(world: &ResolverWorld) {
    let result = world.result();
    assert!(result.leaders().all(|leader| leader.compliant));
    assert_eq!(result.leaders().count(), 3);
}

#[then("no leader is compliant")]
fn then_none_compliant(world: &ResolverWorld) {
    let result = world.result();
    assert!(result.leaders().all(|leader| !leader.compliant));
    assert_eq!(result.leaders().count(), 3);
}

#[then("{count} route requests were made")]
fn then_request_count(world: &ResolverWorld, count: usize) {
    assert_eq!(world.result().stats.route_requests, count);
    assert_eq!(world.corridor.borrow().requests().len(), count);
}

#[then("the session reports a timeout")]
fn then_timed_out(world: &ResolverWorld) {
    let stats = world.result().stats;
    assert!(stats.timed_out);
    assert_eq!(stats.combinations_tested, 0);
}

#[scenario(path = "tests/features/constraint_resolver.feature", index = 0)]
fn costliest_tolls_first(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/constraint_resolver.feature", index = 1)]
fn zero_budget_unavoidable_toll(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/constraint_resolver.feature", index = 2)]
fn budget_met_by_avoiding_open_tolls(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/constraint_resolver.feature", index = 3)]
fn closest_to_percentage_budget(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/constraint_resolver.feature", index = 4)]
fn already_within_limit(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/constraint_resolver.feature", index = 5)]
fn zero_toll_limit_reports_unavoidable_tolls(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/constraint_resolver.feature", index = 6)]
fn unavoidable_tolls_exhaust_tiers(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/constraint_resolver.feature", index = 7)]
fn expired_session_falls_back(world: ResolverWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/constraint_resolver.feature", index = 8)]
fn percentage_budget_met(world: ResolverWorld) {
    let _ = world;
}
