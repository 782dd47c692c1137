//! Route provider trait and avoidance directives.

use std::sync::Arc;

use geo::{Coord, MultiPolygon};

use super::error::RouteError;
use crate::RoutePlan;

/// What the routing engine should steer around.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AvoidDirective {
    /// Plain fastest route.
    #[default]
    None,
    /// Avoid every tolled road.
    AllTollways,
    /// Avoid the given areas.
    Zones(MultiPolygon<f64>),
}

impl AvoidDirective {
    /// True when the directive restricts the route in any way.
    #[must_use]
    pub const fn is_restrictive(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Fetch a road route through a sequence of coordinates.
///
/// Implementations must return [`RouteError::TooFewCoordinates`] for fewer
/// than two coordinates and [`RouteError::NoRoute`] when the engine
/// positively reports that no route exists. Providers are shared across
/// worker threads, hence the `Send + Sync` bound.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use geo::{Coord, LineString};
/// use tollgate_core::{AvoidDirective, RouteError, RoutePlan, RouteProvider};
///
/// struct StraightLine;
///
/// impl RouteProvider for StraightLine {
///     fn get_route(
///         &self,
///         coordinates: &[Coord<f64>],
///         _avoid: &AvoidDirective,
///     ) -> Result<RoutePlan, RouteError> {
///         if coordinates.len() < 2 {
///             return Err(RouteError::TooFewCoordinates);
///         }
///         let line: LineString<f64> = coordinates.to_vec().into();
///         Ok(RoutePlan::new(line, 1_000.0, Duration::from_secs(60)))
///     }
/// }
///
/// let plan = StraightLine.get_route(
///     &[Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }],
///     &AvoidDirective::None,
/// )?;
/// assert_eq!(plan.geometry.0.len(), 2);
/// # Ok::<(), RouteError>(())
/// ```
pub trait RouteProvider: Send + Sync {
    /// Return a route through `coordinates` honouring `avoid`.
    fn get_route(
        &self,
        coordinates: &[Coord<f64>],
        avoid: &AvoidDirective,
    ) -> Result<RoutePlan, RouteError>;
}

impl<T: RouteProvider + ?Sized> RouteProvider for &T {
    fn get_route(
        &self,
        coordinates: &[Coord<f64>],
        avoid: &AvoidDirective,
    ) -> Result<RoutePlan, RouteError> {
        (**self).get_route(coordinates, avoid)
    }
}

impl<T: RouteProvider + ?Sized> RouteProvider for Arc<T> {
    fn get_route(
        &self,
        coordinates: &[Coord<f64>],
        avoid: &AvoidDirective,
    ) -> Result<RoutePlan, RouteError> {
        (**self).get_route(coordinates, avoid)
    }
}
