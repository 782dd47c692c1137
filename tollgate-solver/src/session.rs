//! Per-request state shared by the search stages.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use geo::Coord;
use tollgate_core::{
    AvoidDirective, AvoidanceZoneBuilder, RouteError, RoutePlan, RouteProvider, Telemetry,
};

use crate::SolverConfig;
use crate::costing::RouteCoster;

/// Collaborators, deadline and counters for one optimisation session.
pub(crate) struct Session<'a> {
    pub(crate) provider: &'a dyn RouteProvider,
    pub(crate) coster: RouteCoster<'a>,
    pub(crate) zones: &'a dyn AvoidanceZoneBuilder,
    pub(crate) telemetry: &'a dyn Telemetry,
    pub(crate) config: &'a SolverConfig,
    pub(crate) waypoints: &'a [Coord<f64>],
    started: Instant,
    deadline: Instant,
    route_requests: AtomicUsize,
    tested: AtomicUsize,
}

impl<'a> Session<'a> {
    pub(crate) fn new(
        provider: &'a dyn RouteProvider,
        coster: RouteCoster<'a>,
        zones: &'a dyn AvoidanceZoneBuilder,
        telemetry: &'a dyn Telemetry,
        config: &'a SolverConfig,
        waypoints: &'a [Coord<f64>],
    ) -> Self {
        let started = Instant::now();
        let deadline = started
            .checked_add(config.session_timeout())
            .unwrap_or(started);
        Self {
            provider,
            coster,
            zones,
            telemetry,
            config,
            waypoints,
            started,
            deadline,
            route_requests: AtomicUsize::new(0),
            tested: AtomicUsize::new(0),
        }
    }

    /// Forward a routing request, counting it.
    pub(crate) fn route(
        &self,
        coordinates: &[Coord<f64>],
        avoid: &AvoidDirective,
    ) -> Result<RoutePlan, RouteError> {
        self.route_requests.fetch_add(1, Ordering::Relaxed);
        self.provider.get_route(coordinates, avoid)
    }

    pub(crate) fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn route_requests(&self) -> usize {
        self.route_requests.load(Ordering::Relaxed)
    }

    /// Combinations tested across every search of the session.
    pub(crate) fn tested(&self) -> usize {
        self.tested.load(Ordering::Relaxed)
    }

    pub(crate) fn record_tested(&self, count: usize) {
        self.tested.fetch_add(count, Ordering::Relaxed);
    }

    /// Remaining combination budget under the session ceiling.
    pub(crate) fn remaining_combinations(&self) -> usize {
        self.config.max_combinations.saturating_sub(self.tested())
    }
}
