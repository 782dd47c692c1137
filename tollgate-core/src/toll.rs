//! Toll stations, toll systems and vehicle classes.

use std::fmt;
use std::str::FromStr;

use geo::Coord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Cost;

/// Opaque toll station identifier supplied by the catalog.
///
/// # Examples
///
/// ```
/// use tollgate_core::TollId;
///
/// let id = TollId::from("A7-VIENNE");
/// assert_eq!(id.as_str(), "A7-VIENNE");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TollId(String);

impl TollId {
    /// Wrap an identifier.
    #[must_use]
    pub const fn new(id: String) -> Self {
        Self(id)
    }

    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TollId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for TollId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for TollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a toll station charges.
///
/// The tag is assigned by the catalog at load time and is never inferred
/// from the identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TollSystem {
    /// Fixed tariff charged at the barrier.
    Open,
    /// Tariff depends on the entry and exit of the network.
    Closed,
}

impl TollSystem {
    /// True for closed-system tolls.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Vehicle tariff class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    /// Light vehicles.
    #[default]
    C1,
    /// Intermediate vehicles.
    C2,
    /// Two-axle heavy vehicles.
    C3,
    /// Heavy vehicles with three or more axles.
    C4,
    /// Motorcycles.
    C5,
}

impl VehicleClass {
    /// All classes in tariff-column order.
    pub const ALL: [Self; 5] = [Self::C1, Self::C2, Self::C3, Self::C4, Self::C5];

    /// Lowercase label used in tariff files and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::C1 => "c1",
            Self::C2 => "c2",
            Self::C3 => "c3",
            Self::C4 => "c4",
            Self::C5 => "c5",
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`VehicleClass`] fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown vehicle class `{0}`; expected c1 to c5")]
pub struct ParseVehicleClassError(String);

impl FromStr for VehicleClass {
    type Err = ParseVehicleClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|class| class.as_str() == normalised)
            .ok_or_else(|| ParseVehicleClassError(s.to_owned()))
    }
}

/// A toll station located on a particular route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TollCandidate {
    /// Catalog identifier.
    pub id: TollId,
    /// Station position (`x` = longitude, `y` = latitude).
    pub location: Coord<f64>,
    /// Operating company.
    pub operator: String,
    /// Charging system.
    pub system: TollSystem,
    /// Individual cost on the current route. Closed tolls carry their
    /// marginal share of the run they belong to.
    pub cost: Cost,
    /// Position in route order.
    pub route_index: usize,
}

impl TollCandidate {
    /// Build a candidate with zero cost; the index and cost are filled in
    /// when the toll is located and priced on a route.
    #[must_use]
    pub fn new(
        id: impl Into<TollId>,
        location: Coord<f64>,
        operator: impl Into<String>,
        system: TollSystem,
    ) -> Self {
        Self {
            id: id.into(),
            location,
            operator: operator.into(),
            system,
            cost: Cost::ZERO,
            route_index: 0,
        }
    }

    /// True for closed-system tolls.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.system.is_closed()
    }
}
