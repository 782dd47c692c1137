//! Core domain types for the Tollgate engine.
//!
//! The crate defines the data model of toll-constrained routing (tolls,
//! costs, constraints, route attempts and results), the collaborator traits
//! the optimiser depends on ([`RouteProvider`], [`TollCatalog`],
//! [`PricingService`], [`AvoidanceZoneBuilder`] and [`Telemetry`]) and the
//! shared [`SequenceCostCache`].
//!
//! Constructors that accept raw input return `Result` so invalid values are
//! surfaced before any routing happens.

pub mod avoidance;
pub mod cache;
mod catalog;
mod constraint;
mod cost;
pub mod geometry;
mod optimizer;
mod pricing;
mod result;
mod route;
pub mod routing;
mod serde_secs;
mod telemetry;
mod toll;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use avoidance::{AvoidanceZoneBuilder, BufferZoneBuilder};
pub use cache::{CacheConfig, CacheStats, SequenceCostCache};
pub use catalog::{JunctionRef, TollCatalog};
pub use constraint::{Constraint, ConstraintError, ConstraintMode, Limit};
pub use cost::Cost;
pub use optimizer::{
    DEFAULT_MAX_COMB_SIZE, MAX_COMB_SIZE_CEILING, OptimizeError, OptimizeRequest, Optimizer,
    ValidationError,
};
pub use pricing::{PricingError, PricingService};
pub use result::{Leader, OptimizationResult, OptimizationStats, OptimizationStatus, SearchState};
pub use route::{ComplianceTier, RouteAttempt, RoutePlan};
pub use routing::{AvoidDirective, RouteError, RouteProvider};
pub use telemetry::{LogTelemetry, NoopTelemetry, Telemetry, TelemetryEvent};
pub use toll::{ParseVehicleClassError, TollCandidate, TollId, TollSystem, VehicleClass};
