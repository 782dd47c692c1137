//! Small geodesic helpers shared by catalogs and the route assembler.

use geo::{Closest, ClosestPoint, Coord, Distance, Haversine, LineLocatePoint, LineString, Point};

/// Great-circle distance between two coordinates in metres.
#[must_use]
pub fn haversine_m(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Haversine.distance(Point::from(a), Point::from(b))
}

/// Fractional position of `point` along `line` when it lies within
/// `buffer_m` metres of it.
///
/// Returns `None` for points further away or for degenerate lines.
#[must_use]
pub fn position_along(line: &LineString<f64>, point: Coord<f64>, buffer_m: f64) -> Option<f64> {
    let target = Point::from(point);
    let nearest = match line.closest_point(&target) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => p,
        Closest::Indeterminate => return None,
    };
    if Haversine.distance(nearest, target) > buffer_m {
        return None;
    }
    line.line_locate_point(&target)
}
