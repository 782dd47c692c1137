use geo::Coord;
use thiserror::Error;

use crate::{Constraint, ConstraintError, OptimizationResult, RouteError, VehicleClass};

/// Default maximum number of tolls avoided together.
pub const DEFAULT_MAX_COMB_SIZE: usize = 2;

/// Largest accepted combination size.
pub const MAX_COMB_SIZE_CEILING: usize = 8;

/// Parameters for an optimisation request.
///
/// # Examples
/// ```rust
/// use geo::Coord;
/// use tollgate_core::{Constraint, OptimizeRequest, VehicleClass};
///
/// let request = OptimizeRequest::new(
///     vec![Coord { x: 2.35, y: 48.85 }, Coord { x: 4.83, y: 45.76 }],
///     Constraint::MaxTollCount(1),
/// )
/// .with_vehicle_class(VehicleClass::C2);
/// assert!(request.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeRequest {
    /// Waypoints in travel order (`x` = longitude, `y` = latitude).
    pub coordinates: Vec<Coord<f64>>,
    /// Constraint the route must meet.
    pub constraint: Constraint,
    /// Tariff class.
    pub vehicle_class: VehicleClass,
    /// Largest number of tolls avoided together.
    pub max_comb_size: usize,
}

/// Reasons a request is rejected before any routing happens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Fewer than two waypoints.
    #[error("at least two coordinates are required (got {0})")]
    TooFewCoordinates(usize),
    /// A waypoint is not a valid longitude/latitude pair.
    #[error("coordinate {index} ({lon}, {lat}) is not a valid longitude/latitude")]
    InvalidCoordinate {
        /// Position in the request.
        index: usize,
        /// Supplied longitude.
        lon: f64,
        /// Supplied latitude.
        lat: f64,
    },
    /// The constraint is out of range.
    #[error(transparent)]
    Constraint(#[from] ConstraintError),
    /// Combination size of zero.
    #[error("combination size must be at least 1")]
    ZeroCombinationSize,
    /// Combination size above [`MAX_COMB_SIZE_CEILING`].
    #[error("combination size {requested} exceeds the ceiling of {ceiling}")]
    CombinationSizeTooLarge {
        /// Requested size.
        requested: usize,
        /// Accepted maximum.
        ceiling: usize,
    },
}

impl OptimizeRequest {
    /// Request with the default vehicle class and combination size.
    #[must_use]
    pub fn new(coordinates: Vec<Coord<f64>>, constraint: Constraint) -> Self {
        Self {
            coordinates,
            constraint,
            vehicle_class: VehicleClass::default(),
            max_comb_size: DEFAULT_MAX_COMB_SIZE,
        }
    }

    /// Set the vehicle class.
    #[must_use]
    pub const fn with_vehicle_class(mut self, vehicle_class: VehicleClass) -> Self {
        self.vehicle_class = vehicle_class;
        self
    }

    /// Set the combination size.
    #[must_use]
    pub const fn with_max_comb_size(mut self, max_comb_size: usize) -> Self {
        self.max_comb_size = max_comb_size;
        self
    }

    /// Check the request before routing.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.coordinates.len() < 2 {
            return Err(ValidationError::TooFewCoordinates(self.coordinates.len()));
        }
        if let Some((index, coord)) = self
            .coordinates
            .iter()
            .enumerate()
            .find(|(_, coord)| !is_valid_lon_lat(**coord))
        {
            return Err(ValidationError::InvalidCoordinate {
                index,
                lon: coord.x,
                lat: coord.y,
            });
        }
        self.constraint.validate()?;
        if self.max_comb_size == 0 {
            return Err(ValidationError::ZeroCombinationSize);
        }
        if self.max_comb_size > MAX_COMB_SIZE_CEILING {
            return Err(ValidationError::CombinationSizeTooLarge {
                requested: self.max_comb_size,
                ceiling: MAX_COMB_SIZE_CEILING,
            });
        }
        Ok(())
    }
}

fn is_valid_lon_lat(coord: Coord<f64>) -> bool {
    coord.x.is_finite()
        && coord.y.is_finite()
        && (-180.0..=180.0).contains(&coord.x)
        && (-90.0..=90.0).contains(&coord.y)
}

/// Errors returned by [`Optimizer::optimize`].
///
/// Only invalid input and a genuinely unroutable request are surfaced;
/// everything else degrades into an
/// [`OptimizationStatus`](crate::OptimizationStatus).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    /// The request was rejected.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
    /// No route exists between the endpoints.
    #[error("no route exists between the requested points: {0}")]
    Infeasible(String),
    /// The base route could not be fetched, so no fallback exists.
    #[error("base route unavailable: {0}")]
    BaseRouteUnavailable(#[source] RouteError),
}

/// Find routes meeting a toll constraint.
///
/// Optimisers must be `Send + Sync` so one instance can serve concurrent
/// sessions.
pub trait Optimizer: Send + Sync {
    /// Run one optimisation session.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizeError`] for invalid input or an unroutable request.
    fn optimize(&self, request: &OptimizeRequest) -> Result<OptimizationResult, OptimizeError>;
}
