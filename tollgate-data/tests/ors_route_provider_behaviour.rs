//! Behavioural tests for [`OrsRouteProvider`] against a canned HTTP endpoint.

mod support;

use std::cell::RefCell;
use std::time::Duration;

use geo::{Coord, MultiPolygon, polygon};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use support::{MockOrs, NO_ROUTE_BODY, ROUTE_BODY, closed_base_url};
use tollgate_core::{AvoidDirective, RouteError, RoutePlan, RouteProvider};
use tollgate_data::routing::{OrsRouteProvider, OrsRouteProviderConfig};

#[derive(Debug, Default)]
struct OrsWorld {
    server: RefCell<Option<MockOrs>>,
    base_url: RefCell<String>,
    timeout: RefCell<Option<Duration>>,
    outcome: RefCell<Option<Result<RoutePlan, RouteError>>>,
}

impl OrsWorld {
    fn serve(&self, status: u16, body: &'static str, delay: Duration) {
        let server = MockOrs::start(status, body, delay);
        self.base_url.replace(server.base_url().to_owned());
        self.server.replace(Some(server));
    }

    #[expect(
        clippy::expect_used,
        reason = "behaviour tests use expect for readable failures"
    )]
    fn request(&self, avoid: &AvoidDirective) {
        let base = OrsRouteProviderConfig::new(self.base_url.borrow().clone());
        let config = match *self.timeout.borrow() {
            Some(timeout) => base.with_timeout(timeout),
            None => base,
        };
        let provider = OrsRouteProvider::with_config(config).expect("provider should build");
        let outcome = provider.get_route(
            &[Coord { x: 7.44, y: 48.26 }, Coord { x: 7.75, y: 48.58 }],
            avoid,
        );
        self.outcome.replace(Some(outcome));
    }

    #[expect(
        clippy::expect_used,
        reason = "behaviour tests use expect for readable failures"
    )]
    fn outcome(&self) -> Result<RoutePlan, RouteError> {
        self.outcome
            .borrow()
            .clone()
            .expect("a route should have been requested")
    }

    #[expect(
        clippy::expect_used,
        reason = "behaviour tests use expect for readable failures"
    )]
    fn request_body(&self) -> serde_json::Value {
        let server = self.server.borrow();
        let received = server.as_ref().expect("server running").received();
        received.into_iter().next().expect("one request received")
    }
}

#[fixture]
fn world() -> OrsWorld {
    OrsWorld::default()
}

#[given("a directions service returning a route")]
fn service_ok(world: &OrsWorld) {
    world.serve(200, ROUTE_BODY, Duration::ZERO);
}

#[given("a directions service that cannot find a route")]
fn service_no_route(world: &OrsWorld) {
    world.serve(404, NO_ROUTE_BODY, Duration::ZERO);
}

#[given("a directions service failing with status {status}")]
fn service_failing(world: &OrsWorld, status: u16) {
    world.serve(status, "internal error", Duration::ZERO);
}

#[given("a directions service answering after {secs} seconds")]
fn service_slow(world: &OrsWorld, secs: u64) {
    world.serve(200, ROUTE_BODY, Duration::from_secs(secs));
}

#[given("a request timeout of {secs} seconds")]
fn request_timeout(world: &OrsWorld, secs: u64) {
    world.timeout.replace(Some(Duration::from_secs(secs)));
}

#[given("no directions service is listening")]
fn service_absent(world: &OrsWorld) {
    world.base_url.replace(closed_base_url());
}

#[when("a route between two points is requested")]
fn request_plain(world: &OrsWorld) {
    world.request(&AvoidDirective::None);
}

#[when("a route avoiding all tollways is requested")]
fn request_tollways(world: &OrsWorld) {
    world.request(&AvoidDirective::AllTollways);
}

#[when("a route avoiding a zone around a toll is requested")]
fn request_zone(world: &OrsWorld) {
    let zone = polygon![
        (x: 7.59, y: 48.39),
        (x: 7.61, y: 48.39),
        (x: 7.61, y: 48.41),
        (x: 7.59, y: 48.41)
    ];
    world.request(&AvoidDirective::Zones(MultiPolygon::new(vec![zone])));
}

#[then("a route with {count} points is returned")]
fn route_returned(world: &OrsWorld, count: usize) {
    let outcome = world.outcome();
    let plan = outcome.as_ref().expect("expected a route");
    assert_eq!(plan.geometry.0.len(), count);
    assert_eq!(plan.duration, Duration::from_secs_f64(2710.5));
}

#[then("the request carried no avoidance options")]
fn no_options(world: &OrsWorld) {
    let body = world.request_body();
    assert!(body.get("options").is_none(), "unexpected options in {body}");
    assert_eq!(body["coordinates"], serde_json::json!([[7.44, 48.26], [7.75, 48.58]]));
}

#[then("the request asked to avoid tollways")]
fn avoided_tollways(world: &OrsWorld) {
    let body = world.request_body();
    assert_eq!(body["options"]["avoid_features"], serde_json::json!(["tollways"]));
}

#[then("the request carried an avoidance multipolygon")]
fn avoided_polygons(world: &OrsWorld) {
    let body = world.request_body();
    let polygons = &body["options"]["avoid_polygons"];
    assert_eq!(polygons["type"], "MultiPolygon");
    assert_eq!(polygons["coordinates"][0][0].as_array().map(Vec::len), Some(5));
}

#[then("a no-route error is returned")]
fn no_route(world: &OrsWorld) {
    let outcome = world.outcome();
    assert!(
        matches!(&outcome, Err(RouteError::NoRoute { .. })),
        "expected NoRoute, got {outcome:?}"
    );
}

#[then("an HTTP error with status {status} is returned")]
fn http_error(world: &OrsWorld, status: u16) {
    let outcome = world.outcome();
    assert!(
        matches!(&outcome, Err(RouteError::HttpError { status: got, .. }) if *got == status),
        "expected HTTP {status}, got {outcome:?}"
    );
}

#[then("a network error is returned")]
fn network_error(world: &OrsWorld) {
    let outcome = world.outcome();
    assert!(
        matches!(&outcome, Err(RouteError::NetworkError { .. })),
        "expected NetworkError, got {outcome:?}"
    );
}

#[then("a timeout error is returned")]
fn timeout_error(world: &OrsWorld) {
    let outcome = world.outcome();
    assert!(
        matches!(&outcome, Err(RouteError::Timeout { timeout_secs: 1, .. })),
        "expected Timeout, got {outcome:?}"
    );
}

#[scenario(path = "tests/features/ors_route_provider.feature", index = 0)]
fn fetching_a_plain_route(world: OrsWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/ors_route_provider.feature", index = 1)]
fn avoiding_every_tollway(world: OrsWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/ors_route_provider.feature", index = 2)]
fn avoiding_toll_zones(world: OrsWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/ors_route_provider.feature", index = 3)]
fn engine_finds_no_route(world: OrsWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/ors_route_provider.feature", index = 4)]
fn engine_fails(world: OrsWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/ors_route_provider.feature", index = 5)]
fn engine_unreachable(world: OrsWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/ors_route_provider.feature", index = 6)]
fn engine_too_slow(world: OrsWorld) {
    let _ = world;
}
