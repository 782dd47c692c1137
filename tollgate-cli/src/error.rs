//! Error types emitted by the Tollgate CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
use tollgate_core::{ConstraintError, OptimizeError, ParseVehicleClassError, ValidationError};
use tollgate_data::LoadError;
use tollgate_data::routing::ProviderBuildError;
use tollgate_solver::SolverConfigError;

/// Errors emitted by the Tollgate CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name.
        field: &'static str,
        /// Environment variable carrying the same setting.
        env: &'static str,
    },
    /// A referenced input path does not exist on disk or is not a file.
    #[error("{field} path {path:?} does not exist or is not a file")]
    MissingSourceFile {
        /// Flag naming the file.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Flag naming the file.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// A waypoint is not written as `lon,lat`.
    #[error("{field} value {value:?} is not a `lon,lat` pair")]
    InvalidCoordinate {
        /// Flag carrying the waypoint.
        field: &'static str,
        /// Raw value.
        value: String,
    },
    /// No constraint was given.
    #[error("no constraint given (set one of --max-tolls, --max-budget or --max-budget-percentage)")]
    MissingConstraint,
    /// More than one constraint was given.
    #[error("only one of --max-tolls, --max-budget and --max-budget-percentage may be set")]
    ConflictingConstraints,
    /// The constraint value is out of range.
    #[error(transparent)]
    InvalidConstraint(#[from] ConstraintError),
    /// The vehicle class is not recognised.
    #[error(transparent)]
    InvalidVehicleClass(#[from] ParseVehicleClassError),
    /// The assembled request failed validation.
    #[error("invalid optimisation request: {0}")]
    InvalidRequest(#[source] ValidationError),
    /// Loading the toll catalog failed.
    #[error("failed to load toll catalog: {0}")]
    LoadCatalog(#[source] LoadError),
    /// Loading the tariff table failed.
    #[error("failed to load tariffs: {0}")]
    LoadTariffs(#[source] LoadError),
    /// Reading the solver configuration file failed.
    #[error("failed to read solver configuration at {path:?}: {source}")]
    ReadSolverConfig {
        /// Configuration file.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// Solver configuration JSON could not be decoded.
    #[error("failed to parse solver configuration at {path:?}: {source}")]
    ParseSolverConfig {
        /// Configuration file.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
    /// A solver configuration value is out of range.
    #[error(transparent)]
    InvalidSolverConfig(#[from] SolverConfigError),
    /// Constructing the route provider failed.
    #[error("failed to build route provider for {base_url:?}: {source}")]
    BuildRouteProvider {
        /// Configured ORS base URL.
        base_url: String,
        /// Underlying failure.
        #[source]
        source: ProviderBuildError,
    },
    /// The optimiser rejected the request.
    #[error("optimisation failed: {0}")]
    Optimize(#[source] OptimizeError),
    /// Serialising the optimisation result failed.
    #[error("failed to serialise optimisation result: {0}")]
    SerialiseResult(#[source] serde_json::Error),
    /// Writing the result to the output stream failed.
    #[error("failed to write optimisation result: {0}")]
    WriteOutput(#[source] std::io::Error),
    /// Writing the result file failed.
    #[error("failed to write optimisation result to {path:?}: {source}")]
    WriteOutputFile {
        /// Output file.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
}
