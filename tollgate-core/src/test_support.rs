//! Deterministic collaborators for unit, behaviour and property tests.
//!
//! [`CorridorWorld`] models a straight eastbound motorway along a fixed
//! latitude with toll stations placed at chosen longitudes. Requests that
//! avoid a toll detour north around it, so the catalog no longer finds the
//! toll on the returned geometry. The world implements [`RouteProvider`],
//! [`TollCatalog`] and [`PricingService`] and records every route request.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

use geo::{Coord, Intersects, LineString, Point};
use parking_lot::Mutex;

use crate::geometry::{haversine_m, position_along};
use crate::{
    AvoidDirective, Cost, JunctionRef, PricingError, PricingService, RouteError, RoutePlan,
    RouteProvider, Telemetry, TelemetryEvent, TollCandidate, TollCatalog, TollId, TollSystem,
    VehicleClass,
};

/// Latitude of the corridor.
pub const CORRIDOR_LAT: f64 = 45.0;
/// Northward offset of a detour around an avoided toll, in degrees.
pub const DETOUR_OFFSET: f64 = 0.05;
/// Offset of a toll's approach junction west of the toll, in degrees.
pub const JUNCTION_OFFSET: f64 = 0.03;
/// Constant travel speed in metres per second.
pub const CORRIDOR_SPEED_MPS: f64 = 25.0;

/// Route provider returning a straight line through the waypoints.
#[derive(Debug, Default)]
pub struct StubRouteProvider {
    failure: Option<RouteError>,
    requests: Mutex<usize>,
}

impl StubRouteProvider {
    /// Provider that always succeeds.
    #[must_use]
    pub fn straight_line() -> Self {
        Self::default()
    }

    /// Provider that always fails with `error`.
    #[must_use]
    pub fn with_error(error: RouteError) -> Self {
        Self {
            failure: Some(error),
            requests: Mutex::new(0),
        }
    }

    /// Number of requests served.
    #[must_use]
    pub fn request_count(&self) -> usize {
        *self.requests.lock()
    }
}

impl RouteProvider for StubRouteProvider {
    fn get_route(
        &self,
        coordinates: &[Coord<f64>],
        _avoid: &AvoidDirective,
    ) -> Result<RoutePlan, RouteError> {
        *self.requests.lock() += 1;
        if coordinates.len() < 2 {
            return Err(RouteError::TooFewCoordinates);
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(plan_through(coordinates.to_vec()))
    }
}

/// What a recorded request asked the engine to avoid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedAvoidance {
    /// Nothing.
    Nothing,
    /// Every tollway.
    AllTollways,
    /// The tolls covered by the avoidance zones, sorted by id.
    Tolls(Vec<TollId>),
}

/// A route request seen by [`CorridorWorld`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Requested waypoints.
    pub coordinates: Vec<Coord<f64>>,
    /// Requested avoidance.
    pub avoidance: RecordedAvoidance,
}

#[derive(Debug, Clone)]
struct CorridorToll {
    candidate: TollCandidate,
    unit_cost: Cost,
}

/// Synthetic motorway corridor acting as router, catalog and tariff table.
#[derive(Debug, Default)]
pub struct CorridorWorld {
    tolls: Vec<CorridorToll>,
    unavoidable: HashSet<TollId>,
    without_junction: HashSet<TollId>,
    sequence_prices: HashMap<Vec<TollId>, Cost>,
    unroutable: HashMap<BTreeSet<TollId>, RouteError>,
    base_failure: Option<RouteError>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl CorridorWorld {
    /// Empty corridor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a toll at longitude `x` with a unit tariff in cents.
    #[must_use]
    pub fn with_toll(mut self, id: &str, x: f64, system: TollSystem, cents: u64) -> Self {
        let candidate = TollCandidate::new(id, Coord { x, y: CORRIDOR_LAT }, "corridor", system);
        self.tolls.push(CorridorToll {
            candidate,
            unit_cost: Cost::from_cents(cents),
        });
        self.tolls
            .sort_by(|a, b| a.candidate.location.x.total_cmp(&b.candidate.location.x));
        self
    }

    /// Mark a toll as impossible to route around.
    #[must_use]
    pub fn with_unavoidable(mut self, id: &str) -> Self {
        self.unavoidable.insert(TollId::from(id));
        self
    }

    /// Remove a toll's approach junction from the catalog.
    #[must_use]
    pub fn without_junction(mut self, id: &str) -> Self {
        self.without_junction.insert(TollId::from(id));
        self
    }

    /// Price a closed run explicitly instead of summing unit tariffs.
    #[must_use]
    pub fn with_sequence_price(mut self, ids: &[&str], cents: u64) -> Self {
        let key = ids.iter().map(|id| TollId::from(*id)).collect();
        self.sequence_prices.insert(key, Cost::from_cents(cents));
        self
    }

    /// Fail requests that avoid exactly `ids`.
    #[must_use]
    pub fn with_unroutable(mut self, ids: &[&str], error: RouteError) -> Self {
        let key = ids.iter().map(|id| TollId::from(*id)).collect();
        self.unroutable.insert(key, error);
        self
    }

    /// Fail every unrestricted request.
    #[must_use]
    pub fn with_base_failure(mut self, error: RouteError) -> Self {
        self.base_failure = Some(error);
        self
    }

    /// Default start and end of the corridor.
    #[must_use]
    pub const fn endpoints(&self) -> [Coord<f64>; 2] {
        [
            Coord {
                x: 0.0,
                y: CORRIDOR_LAT,
            },
            Coord {
                x: 1.0,
                y: CORRIDOR_LAT,
            },
        ]
    }

    /// Toll candidate by id, as the catalog would return it.
    #[must_use]
    pub fn toll(&self, id: &str) -> Option<TollCandidate> {
        self.tolls
            .iter()
            .find(|toll| toll.candidate.id.as_str() == id)
            .map(|toll| toll.candidate.clone())
    }

    /// Every request served so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Avoided toll sets of requests that used avoidance zones, in order.
    #[must_use]
    pub fn avoided_sets(&self) -> Vec<Vec<TollId>> {
        self.requests
            .lock()
            .iter()
            .filter_map(|request| match &request.avoidance {
                RecordedAvoidance::Tolls(ids) => Some(ids.clone()),
                _ => None,
            })
            .collect()
    }

    fn avoided_by(&self, avoid: &AvoidDirective) -> (RecordedAvoidance, BTreeSet<TollId>) {
        match avoid {
            AvoidDirective::None => (RecordedAvoidance::Nothing, BTreeSet::new()),
            AvoidDirective::AllTollways => (
                RecordedAvoidance::AllTollways,
                self.tolls
                    .iter()
                    .map(|toll| toll.candidate.id.clone())
                    .filter(|id| !self.unavoidable.contains(id))
                    .collect(),
            ),
            AvoidDirective::Zones(zones) => {
                let hit: BTreeSet<TollId> = self
                    .tolls
                    .iter()
                    .filter(|toll| zones.intersects(&Point::from(toll.candidate.location)))
                    .map(|toll| toll.candidate.id.clone())
                    .collect();
                let recorded = RecordedAvoidance::Tolls(hit.iter().cloned().collect());
                let honoured = hit
                    .into_iter()
                    .filter(|id| !self.unavoidable.contains(id))
                    .collect();
                (recorded, honoured)
            }
        }
    }

    fn unit_cost(&self, id: &TollId, class: VehicleClass) -> Result<Cost, PricingError> {
        self.tolls
            .iter()
            .find(|toll| &toll.candidate.id == id)
            .map(|toll| toll.unit_cost)
            .ok_or_else(|| PricingError::MissingTariff {
                ids: vec![id.clone()],
                class,
            })
    }
}

impl RouteProvider for CorridorWorld {
    fn get_route(
        &self,
        coordinates: &[Coord<f64>],
        avoid: &AvoidDirective,
    ) -> Result<RoutePlan, RouteError> {
        let (recorded, avoided) = self.avoided_by(avoid);
        self.requests.lock().push(RecordedRequest {
            coordinates: coordinates.to_vec(),
            avoidance: recorded.clone(),
        });
        let (Some(first), Some(last)) = (coordinates.first(), coordinates.last()) else {
            return Err(RouteError::TooFewCoordinates);
        };
        if coordinates.len() < 2 {
            return Err(RouteError::TooFewCoordinates);
        }
        if recorded == RecordedAvoidance::Nothing {
            if let Some(error) = &self.base_failure {
                return Err(error.clone());
            }
        }
        if let RecordedAvoidance::Tolls(ids) = &recorded {
            let key: BTreeSet<TollId> = ids.iter().cloned().collect();
            if let Some(error) = self.unroutable.get(&key) {
                return Err(error.clone());
            }
        }

        let (west, east) = (first.x.min(last.x), first.x.max(last.x));
        let mut interior: Vec<Coord<f64>> = coordinates
            .iter()
            .skip(1)
            .take(coordinates.len().saturating_sub(2))
            .copied()
            .collect();
        interior.extend(
            self.tolls
                .iter()
                .map(|toll| toll.candidate.location)
                .filter(|location| location.x > west && location.x < east)
                .map(|location| self.vertex_for(location, &avoided)),
        );
        interior.sort_by(|a, b| a.x.total_cmp(&b.x));
        let mut points = Vec::with_capacity(interior.len().saturating_add(2));
        points.push(*first);
        points.extend(interior);
        points.push(*last);
        Ok(plan_through(points))
    }
}

impl CorridorWorld {
    #[expect(clippy::float_arithmetic, reason = "detour vertex lies north of the toll")]
    fn vertex_for(&self, location: Coord<f64>, avoided: &BTreeSet<TollId>) -> Coord<f64> {
        let is_avoided = self
            .tolls
            .iter()
            .any(|toll| toll.candidate.location == location && avoided.contains(&toll.candidate.id));
        if is_avoided {
            Coord {
                x: location.x,
                y: location.y + DETOUR_OFFSET,
            }
        } else {
            location
        }
    }
}

impl TollCatalog for CorridorWorld {
    fn find_tolls_on_route(
        &self,
        geometry: &LineString<f64>,
        buffer_m: f64,
    ) -> Vec<TollCandidate> {
        let mut found: Vec<(f64, TollCandidate)> = self
            .tolls
            .iter()
            .filter_map(|toll| {
                position_along(geometry, toll.candidate.location, buffer_m)
                    .map(|fraction| (fraction, toll.candidate.clone()))
            })
            .collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0));
        found
            .into_iter()
            .enumerate()
            .map(|(index, (_, mut candidate))| {
                candidate.route_index = index;
                candidate
            })
            .collect()
    }

    #[expect(clippy::float_arithmetic, reason = "junction sits west of its toll")]
    fn junction_before(&self, toll: &TollId) -> Option<JunctionRef> {
        if self.without_junction.contains(toll) {
            return None;
        }
        self.tolls
            .iter()
            .find(|candidate| &candidate.candidate.id == toll)
            .map(|candidate| JunctionRef {
                id: format!("J-{toll}"),
                name: None,
                location: Coord {
                    x: candidate.candidate.location.x - JUNCTION_OFFSET,
                    y: CORRIDOR_LAT,
                },
            })
    }
}

impl PricingService for CorridorWorld {
    fn open_toll_cost(&self, id: &TollId, class: VehicleClass) -> Result<Cost, PricingError> {
        self.unit_cost(id, class)
    }

    fn closed_sequence_cost(
        &self,
        ids: &[TollId],
        class: VehicleClass,
    ) -> Result<Cost, PricingError> {
        if let Some(cost) = self.sequence_prices.get(ids) {
            return Ok(*cost);
        }
        ids.iter().map(|id| self.unit_cost(id, class)).sum()
    }
}

/// Telemetry sink that keeps every event.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingTelemetry {
    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().clone()
    }
}

impl Telemetry for RecordingTelemetry {
    fn record(&self, event: TelemetryEvent) {
        self.events.lock().push(event);
    }
}

#[expect(
    clippy::float_arithmetic,
    reason = "synthetic totals derive from geodesic length"
)]
fn plan_through(points: Vec<Coord<f64>>) -> RoutePlan {
    let distance_m: f64 = points
        .windows(2)
        .filter_map(|pair| match pair {
            [a, b] => Some(haversine_m(*a, *b)),
            _ => None,
        })
        .sum();
    let duration = Duration::try_from_secs_f64(distance_m / CORRIDOR_SPEED_MPS)
        .unwrap_or(Duration::ZERO);
    RoutePlan::new(LineString::from(points), distance_m, duration)
}
