//! Toll station lookup along route geometries.

use std::sync::Arc;

use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};

use crate::{TollCandidate, TollId};

/// A motorway junction used to split a route into segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JunctionRef {
    /// Catalog identifier.
    pub id: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Junction position.
    pub location: Coord<f64>,
}

/// Read-only catalog of toll stations and their approach junctions.
///
/// Catalogs are loaded once and shared across sessions, so implementations
/// must be immutable after construction.
pub trait TollCatalog: Send + Sync {
    /// Tolls lying within `buffer_m` metres of `geometry`, ordered by their
    /// position along it.
    ///
    /// Returned candidates carry their `route_index` and a zero cost; pricing
    /// happens downstream.
    fn find_tolls_on_route(&self, geometry: &LineString<f64>, buffer_m: f64)
    -> Vec<TollCandidate>;

    /// The nearest motorway junction preceding `toll`, if one is known.
    fn junction_before(&self, toll: &TollId) -> Option<JunctionRef>;
}

impl<T: TollCatalog + ?Sized> TollCatalog for &T {
    fn find_tolls_on_route(
        &self,
        geometry: &LineString<f64>,
        buffer_m: f64,
    ) -> Vec<TollCandidate> {
        (**self).find_tolls_on_route(geometry, buffer_m)
    }

    fn junction_before(&self, toll: &TollId) -> Option<JunctionRef> {
        (**self).junction_before(toll)
    }
}

impl<T: TollCatalog + ?Sized> TollCatalog for Arc<T> {
    fn find_tolls_on_route(
        &self,
        geometry: &LineString<f64>,
        buffer_m: f64,
    ) -> Vec<TollCandidate> {
        (**self).find_tolls_on_route(geometry, buffer_m)
    }

    fn junction_before(&self, toll: &TollId) -> Option<JunctionRef> {
        (**self).junction_before(toll)
    }
}
