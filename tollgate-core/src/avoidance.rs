//! Turn a set of tolls into an avoidance directive for the routing engine.

use std::f64::consts::TAU;

use geo::{Coord, LineString, MultiPolygon, Polygon};

use crate::{AvoidDirective, TollCandidate};

/// Metres per degree of latitude.
pub const METRES_PER_DEGREE: f64 = 111_120.0;

/// Default disc radius around an avoided toll, in metres.
pub const DEFAULT_AVOID_RADIUS_M: f64 = 200.0;

const DEFAULT_SIDES: u32 = 16;

/// Build the directive used to steer a route around `tolls`.
pub trait AvoidanceZoneBuilder: Send + Sync {
    /// Directive avoiding every toll in `tolls`. An empty slice yields
    /// [`AvoidDirective::None`].
    fn build(&self, tolls: &[TollCandidate]) -> AvoidDirective;
}

/// Approximates a disc around each toll with a regular polygon.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use tollgate_core::{AvoidDirective, AvoidanceZoneBuilder, BufferZoneBuilder, TollCandidate, TollSystem};
///
/// let toll = TollCandidate::new("T1", Coord { x: 4.8, y: 45.7 }, "ASF", TollSystem::Open);
/// let directive = BufferZoneBuilder::default().build(&[toll]);
/// assert!(matches!(directive, AvoidDirective::Zones(zones) if zones.0.len() == 1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferZoneBuilder {
    radius_m: f64,
    sides: u32,
}

impl Default for BufferZoneBuilder {
    fn default() -> Self {
        Self {
            radius_m: DEFAULT_AVOID_RADIUS_M,
            sides: DEFAULT_SIDES,
        }
    }
}

impl BufferZoneBuilder {
    /// Builder with a custom disc radius.
    #[must_use]
    pub fn with_radius(radius_m: f64) -> Self {
        Self {
            radius_m,
            ..Self::default()
        }
    }

    /// Override the number of polygon sides (at least 3).
    #[must_use]
    pub fn with_sides(mut self, sides: u32) -> Self {
        self.sides = sides.max(3);
        self
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "disc vertices are computed in degrees from a metric radius"
    )]
    fn disc(&self, centre: Coord<f64>) -> Polygon<f64> {
        let lat_radius = self.radius_m / METRES_PER_DEGREE;
        let cos_lat = centre.y.to_radians().cos().abs().max(1e-6);
        let lon_radius = lat_radius / cos_lat;
        let step = TAU / f64::from(self.sides);
        let ring: Vec<Coord<f64>> = (0..self.sides)
            .map(|i| {
                let angle = step * f64::from(i);
                Coord {
                    x: centre.x + lon_radius * angle.cos(),
                    y: centre.y + lat_radius * angle.sin(),
                }
            })
            .collect();
        // `Polygon::new` closes the ring.
        Polygon::new(LineString::from(ring), Vec::new())
    }
}

impl AvoidanceZoneBuilder for BufferZoneBuilder {
    fn build(&self, tolls: &[TollCandidate]) -> AvoidDirective {
        if tolls.is_empty() {
            return AvoidDirective::None;
        }
        let zones = tolls.iter().map(|toll| self.disc(toll.location)).collect();
        AvoidDirective::Zones(MultiPolygon::new(zones))
    }
}
