//! Behavioural tests for the sequence cost cache.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use geo::Coord;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tollgate_core::{
    CacheConfig, Cost, SequenceCostCache, TollCandidate, TollSystem, VehicleClass,
};

struct CacheWorld {
    cache: RefCell<SequenceCostCache>,
    epoch: Instant,
}

#[fixture]
fn world() -> CacheWorld {
    CacheWorld {
        cache: RefCell::new(SequenceCostCache::default()),
        epoch: Instant::now(),
    }
}

fn sequence(ids: &str, system: TollSystem) -> Vec<TollCandidate> {
    ids.split(',')
        .map(|id| TollCandidate::new(id.trim(), Coord { x: 0.0, y: 0.0 }, "op", system))
        .collect()
}

#[given("an empty cost cache with capacity {capacity}")]
fn given_cache(world: &CacheWorld, capacity: usize) {
    world.cache.replace(SequenceCostCache::new(
        CacheConfig::default().with_capacity(capacity),
    ));
}

#[when("the open sequence {ids} is stored at {cents} cents")]
fn when_open_stored(world: &CacheWorld, ids: String, cents: u64) {
    world.cache.borrow().put_at(
        &sequence(ids.trim_matches('"'), TollSystem::Open),
        VehicleClass::C1,
        Cost::from_cents(cents),
        world.epoch,
    );
}

#[when("the closed sequence {ids} is stored at {cents} cents")]
fn when_closed_stored(world: &CacheWorld, ids: String, cents: u64) {
    world.cache.borrow().put_at(
        &sequence(ids.trim_matches('"'), TollSystem::Closed),
        VehicleClass::C1,
        Cost::from_cents(cents),
        world.epoch,
    );
}

#[when("{ids} is looked up")]
fn when_looked_up(world: &CacheWorld, ids: String) {
    let found = world.cache.borrow().get_at(
        &sequence(ids.trim_matches('"'), TollSystem::Open),
        VehicleClass::C1,
        world.epoch,
    );
    assert!(found.is_some(), "expected {ids} to be cached");
}

fn lookup(world: &CacheWorld, ids: &str, system: TollSystem, after: Duration) -> Option<Cost> {
    world.cache.borrow().get_at(
        &sequence(ids.trim_matches('"'), system),
        VehicleClass::C1,
        world.epoch + after,
    )
}

#[then("looking up {ids} after {minutes} minutes returns {cents} cents")]
fn then_hit(world: &CacheWorld, ids: String, minutes: u64, cents: u64) {
    let found = lookup(world, &ids, TollSystem::Open, Duration::from_secs(minutes * 60));
    assert_eq!(found, Some(Cost::from_cents(cents)));
}

#[then("looking up {ids} after {minutes} minutes misses")]
fn then_miss(world: &CacheWorld, ids: String, minutes: u64) {
    let found = lookup(world, &ids, TollSystem::Open, Duration::from_secs(minutes * 60));
    assert_eq!(found, None);
}

#[then("the closed sequence {ids} is still priced at {cents} cents after {hours} hours")]
fn then_closed_hit(world: &CacheWorld, ids: String, cents: u64, hours: u64) {
    let found = lookup(
        world,
        &ids,
        TollSystem::Closed,
        Duration::from_secs(hours * 3600),
    );
    assert_eq!(found, Some(Cost::from_cents(cents)));
}

#[then("the reversed closed sequence {ids} is not cached")]
fn then_closed_miss(world: &CacheWorld, ids: String) {
    let found = lookup(world, &ids, TollSystem::Closed, Duration::from_secs(60));
    assert_eq!(found, None);
}

#[then("the cache reports {count} eviction")]
fn then_evictions(world: &CacheWorld, count: u64) {
    assert_eq!(world.cache.borrow().stats().evictions, count);
}

#[scenario(path = "tests/features/sequence_cost_cache.feature", index = 0)]
fn stored_sequence_expires(world: CacheWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/sequence_cost_cache.feature", index = 1)]
fn least_recently_used_is_evicted(world: CacheWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/sequence_cost_cache.feature", index = 2)]
fn closed_sequences_live_longer(world: CacheWorld) {
    let _ = world;
}
