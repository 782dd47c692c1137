//! In-memory toll catalog loaded from a linked JSON export.
//!
//! The file lists toll stations and the motorway junctions that precede them:
//!
//! ```json
//! {
//!   "tolls": [
//!     {"id": "T1", "lon": 7.51, "lat": 48.31, "operator": "APRR", "system": "closed"}
//!   ],
//!   "junctions": [
//!     {"id": "J1", "lon": 7.49, "lat": 48.30, "name": "Sortie 12", "before": ["T1"]}
//!   ]
//! }
//! ```
//!
//! Stations are indexed in an R\*-tree so route lookups only measure the
//! stations inside the route's padded bounding box.

use std::collections::{HashMap, HashSet};

use camino::{Utf8Path, Utf8PathBuf};
use geo::{BoundingRect, Coord, LineString};
use log::{debug, warn};
use rstar::{AABB, RTree, RTreeObject};
use serde::Deserialize;
use tollgate_core::geometry::{haversine_m, position_along};
use tollgate_core::{Cost, JunctionRef, TollCandidate, TollCatalog, TollId, TollSystem};

use crate::LoadError;

/// Metres per degree of latitude.
const METRES_PER_DEGREE: f64 = 111_320.0;

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    tolls: Vec<TollRecord>,
    #[serde(default)]
    junctions: Vec<JunctionRecord>,
}

#[derive(Debug, Deserialize)]
struct TollRecord {
    id: String,
    lon: f64,
    lat: f64,
    #[serde(default)]
    operator: String,
    system: TollSystem,
}

#[derive(Debug, Deserialize)]
struct JunctionRecord {
    id: String,
    lon: f64,
    lat: f64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    before: Vec<String>,
}

#[derive(Debug, Clone)]
struct IndexedToll(TollCandidate);

impl RTreeObject for IndexedToll {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.0.location.x, self.0.location.y])
    }
}

/// Toll catalog backed by an R\*-tree of stations.
///
/// Immutable once built, so one instance can be shared across sessions.
#[derive(Debug)]
pub struct JsonTollCatalog {
    index: RTree<IndexedToll>,
    junctions: HashMap<TollId, JunctionRef>,
}

impl JsonTollCatalog {
    /// Load a catalog file.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the file cannot be read or parsed, or when
    /// it contains duplicate ids or invalid coordinates.
    pub fn load(path: &Utf8Path) -> Result<Self, LoadError> {
        let text = tollgate_fs::read_utf8(path).map_err(|source| LoadError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Build a catalog from JSON text.
    ///
    /// # Errors
    ///
    /// As for [`JsonTollCatalog::load`], minus I/O failures.
    pub fn from_json_str(text: &str) -> Result<Self, LoadError> {
        Self::parse(text, &Utf8PathBuf::from("<inline>"))
    }

    fn parse(text: &str, path: &Utf8Path) -> Result<Self, LoadError> {
        let document: CatalogDocument =
            serde_json::from_str(text).map_err(|source| LoadError::Parse {
                path: path.to_owned(),
                source,
            })?;
        Self::from_document(document, path.as_str())
    }

    fn from_document(document: CatalogDocument, origin: &str) -> Result<Self, LoadError> {
        let invalid = |message: String| LoadError::Invalid {
            origin: origin.to_owned(),
            message,
        };

        let mut seen = HashSet::new();
        let mut stations = Vec::with_capacity(document.tolls.len());
        for record in document.tolls {
            let location = checked_coord(record.lon, record.lat)
                .ok_or_else(|| invalid(format!("toll {} has invalid coordinates", record.id)))?;
            if !seen.insert(record.id.clone()) {
                return Err(invalid(format!("duplicate toll id {}", record.id)));
            }
            stations.push(IndexedToll(TollCandidate::new(
                record.id,
                location,
                record.operator,
                record.system,
            )));
        }

        let locations: HashMap<TollId, Coord<f64>> = stations
            .iter()
            .map(|IndexedToll(toll)| (toll.id.clone(), toll.location))
            .collect();
        let mut junctions: HashMap<TollId, JunctionRef> = HashMap::new();
        for record in document.junctions {
            let location = checked_coord(record.lon, record.lat).ok_or_else(|| {
                invalid(format!("junction {} has invalid coordinates", record.id))
            })?;
            let junction = JunctionRef {
                id: record.id,
                name: record.name,
                location,
            };
            for toll in record.before.into_iter().map(TollId::from) {
                let Some(&toll_location) = locations.get(&toll) else {
                    warn!("junction {} precedes unknown toll {toll}", junction.id);
                    continue;
                };
                let closer = junctions.get(&toll).is_none_or(|current| {
                    haversine_m(location, toll_location)
                        < haversine_m(current.location, toll_location)
                });
                if closer {
                    junctions.insert(toll, junction.clone());
                }
            }
        }

        debug!(
            "loaded {} tolls and {} junction links from {origin}",
            stations.len(),
            junctions.len()
        );
        Ok(Self {
            index: RTree::bulk_load(stations),
            junctions,
        })
    }

    /// Number of toll stations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.size()
    }

    /// True when the catalog holds no stations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.size() == 0
    }
}

impl TollCatalog for JsonTollCatalog {
    fn find_tolls_on_route(
        &self,
        geometry: &LineString<f64>,
        buffer_m: f64,
    ) -> Vec<TollCandidate> {
        let Some(envelope) = search_envelope(geometry, buffer_m) else {
            return Vec::new();
        };
        let mut located: Vec<(f64, &TollCandidate)> = self
            .index
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|IndexedToll(toll)| {
                position_along(geometry, toll.location, buffer_m).map(|fraction| (fraction, toll))
            })
            .collect();
        located.sort_by(|(a, left), (b, right)| a.total_cmp(b).then_with(|| left.id.cmp(&right.id)));
        located
            .into_iter()
            .enumerate()
            .map(|(route_index, (_, toll))| TollCandidate {
                cost: Cost::ZERO,
                route_index,
                ..toll.clone()
            })
            .collect()
    }

    fn junction_before(&self, toll: &TollId) -> Option<JunctionRef> {
        self.junctions.get(toll).cloned()
    }
}

fn checked_coord(lon: f64, lat: f64) -> Option<Coord<f64>> {
    ((-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat)).then_some(Coord {
        x: lon,
        y: lat,
    })
}

/// Bounding box of `geometry` padded by `buffer_m` metres.
#[expect(clippy::float_arithmetic, reason = "degree padding for the envelope")]
fn search_envelope(geometry: &LineString<f64>, buffer_m: f64) -> Option<AABB<[f64; 2]>> {
    let rect = geometry.bounding_rect()?;
    let (min, max) = (rect.min(), rect.max());
    let lat_pad = buffer_m.max(0.0) / METRES_PER_DEGREE;
    let widest = min.y.abs().max(max.y.abs()).min(89.0).to_radians().cos();
    let lon_pad = lat_pad / widest;
    Some(AABB::from_corners(
        [min.x - lon_pad, min.y - lat_pad],
        [max.x + lon_pad, max.y + lat_pad],
    ))
}
