//! Facade crate for the Tollgate route optimiser.
//!
//! This crate re-exports the core domain types and the default
//! [`ConstraintResolver`], and exposes the JSON and OpenRouteService adapters
//! behind the `data` feature.

#![forbid(unsafe_code)]

pub use tollgate_core::{
    AvoidDirective, Constraint, Cost, Leader, OptimizationResult, OptimizationStatus,
    OptimizeError, OptimizeRequest, Optimizer, PricingService, RouteError, RouteProvider,
    SequenceCostCache, TollCandidate, TollCatalog, TollId, TollSystem, VehicleClass,
};
pub use tollgate_solver::{ConstraintResolver, SolverConfig};

#[cfg(feature = "data")]
pub use tollgate_data::{
    JsonTollCatalog, LoadError, TariffTable,
    routing::{OrsRouteProvider, OrsRouteProviderConfig},
};
