//! Optimize command implementation for the Tollgate CLI.

use std::io::Write;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use geo::Coord;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tollgate_core::{
    Constraint, DEFAULT_MAX_COMB_SIZE, OptimizationResult, OptimizeRequest, Optimizer,
    VehicleClass,
};
use tollgate_data::routing::{OrsRouteProvider, OrsRouteProviderConfig};
use tollgate_data::{JsonTollCatalog, TariffTable};
use tollgate_solver::{ConstraintResolver, SolverConfig};

use crate::{
    ARG_CATALOG, ARG_FROM, ARG_MAX_BUDGET, ARG_MAX_BUDGET_PERCENTAGE, ARG_MAX_COMB_SIZE,
    ARG_MAX_TOLLS, ARG_ORS_API_KEY, ARG_ORS_BASE_URL, ARG_ORS_PROFILE, ARG_ORS_TIMEOUT_SECS,
    ARG_OUTPUT, ARG_SOLVER_CONFIG, ARG_TARIFFS, ARG_TO, ARG_VEHICLE_CLASS, ARG_VIA, CliError,
    ENV_CATALOG, ENV_FROM, ENV_TARIFFS, ENV_TO,
};

/// CLI arguments for the `optimize` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Route between waypoints through an OpenRouteService \
                 instance, locate tolls with a JSON toll catalog, price them \
                 with a JSON tariff table and search for routes meeting the \
                 constraint. Exactly one of --max-tolls, --max-budget and \
                 --max-budget-percentage must be set.",
    name = "optimize",
    about = "Optimise a route under a toll constraint"
)]
#[ortho_config(prefix = "TOLLGATE")]
pub(crate) struct OptimizeArgs {
    /// Path to the JSON toll catalog.
    #[arg(long = ARG_CATALOG, value_name = "path")]
    #[serde(default)]
    pub(crate) catalog: Option<Utf8PathBuf>,
    /// Path to the JSON tariff table.
    #[arg(long = ARG_TARIFFS, value_name = "path")]
    #[serde(default)]
    pub(crate) tariffs: Option<Utf8PathBuf>,
    /// Start point as `lon,lat`.
    #[arg(long = ARG_FROM, value_name = "lon,lat", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) from: Option<String>,
    /// End point as `lon,lat`.
    #[arg(long = ARG_TO, value_name = "lon,lat", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) to: Option<String>,
    /// Intermediate waypoints as `lon,lat;lon,lat`.
    #[arg(long = ARG_VIA, value_name = "lon,lat;...", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) via: Option<String>,
    /// Allow at most this many toll stations.
    #[arg(long = ARG_MAX_TOLLS, value_name = "count")]
    #[serde(default)]
    pub(crate) max_tolls: Option<i64>,
    /// Spend at most this many euros on tolls.
    #[arg(long = ARG_MAX_BUDGET, value_name = "euros")]
    #[serde(default)]
    pub(crate) max_budget: Option<f64>,
    /// Spend at most this share of the direct route's tolls, in `[0, 1]`.
    #[arg(long = ARG_MAX_BUDGET_PERCENTAGE, value_name = "share")]
    #[serde(default)]
    pub(crate) max_budget_percentage: Option<f64>,
    /// Tariff class, `c1` to `c5` (default `c1`).
    #[arg(long = ARG_VEHICLE_CLASS, value_name = "class")]
    #[serde(default)]
    pub(crate) vehicle_class: Option<String>,
    /// Largest number of tolls avoided together.
    #[arg(long = ARG_MAX_COMB_SIZE, value_name = "size")]
    #[serde(default)]
    pub(crate) max_comb_size: Option<usize>,
    /// Path to a JSON file overriding solver thresholds.
    #[arg(long = ARG_SOLVER_CONFIG, value_name = "path")]
    #[serde(default)]
    pub(crate) solver_config: Option<Utf8PathBuf>,
    /// Base URL of the OpenRouteService instance.
    #[arg(long = ARG_ORS_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) ors_base_url: Option<String>,
    /// ORS routing profile (default `driving-car`).
    #[arg(long = ARG_ORS_PROFILE, value_name = "profile")]
    #[serde(default)]
    pub(crate) ors_profile: Option<String>,
    /// API key sent to hosted ORS instances.
    #[arg(long = ARG_ORS_API_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) ors_api_key: Option<String>,
    /// Per-request timeout for the routing engine.
    #[arg(long = ARG_ORS_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) ors_timeout_secs: Option<u64>,
    /// Write the result here instead of standard output.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
}

impl OptimizeArgs {
    pub(crate) fn into_config(self) -> Result<OptimizeConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        OptimizeConfig::try_from(merged)
    }
}

/// Resolved `optimize` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OptimizeConfig {
    /// Path to the toll catalog.
    pub(crate) catalog: Utf8PathBuf,
    /// Path to the tariff table.
    pub(crate) tariffs: Utf8PathBuf,
    /// Waypoints in travel order.
    pub(crate) coordinates: Vec<Coord<f64>>,
    pub(crate) constraint: Constraint,
    pub(crate) vehicle_class: VehicleClass,
    pub(crate) max_comb_size: usize,
    /// Optional solver threshold overrides.
    pub(crate) solver_config: Option<Utf8PathBuf>,
    pub(crate) ors: OrsRouteProviderConfig,
    /// Result file; standard output when absent.
    pub(crate) output: Option<Utf8PathBuf>,
}

impl OptimizeConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        Self::require_existing(&self.catalog, ARG_CATALOG)?;
        Self::require_existing(&self.tariffs, ARG_TARIFFS)?;
        if let Some(path) = &self.solver_config {
            Self::require_existing(path, ARG_SOLVER_CONFIG)?;
        }
        Ok(())
    }

    fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
        match tollgate_fs::file_is_file(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            }),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(CliError::MissingSourceFile {
                    field,
                    path: path.to_path_buf(),
                })
            }
            Err(source) => Err(CliError::InspectSourcePath {
                field,
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// The optimisation request described by this configuration.
    pub(crate) fn request(&self) -> OptimizeRequest {
        OptimizeRequest::new(self.coordinates.clone(), self.constraint)
            .with_vehicle_class(self.vehicle_class)
            .with_max_comb_size(self.max_comb_size)
    }
}

impl TryFrom<OptimizeArgs> for OptimizeConfig {
    type Error = CliError;

    fn try_from(args: OptimizeArgs) -> Result<Self, Self::Error> {
        let catalog = args.catalog.ok_or(CliError::MissingArgument {
            field: ARG_CATALOG,
            env: ENV_CATALOG,
        })?;
        let tariffs = args.tariffs.ok_or(CliError::MissingArgument {
            field: ARG_TARIFFS,
            env: ENV_TARIFFS,
        })?;
        let from = args.from.ok_or(CliError::MissingArgument {
            field: ARG_FROM,
            env: ENV_FROM,
        })?;
        let to = args.to.ok_or(CliError::MissingArgument {
            field: ARG_TO,
            env: ENV_TO,
        })?;

        let mut coordinates = vec![parse_coordinate(&from, ARG_FROM)?];
        if let Some(via) = &args.via {
            for point in via.split(';').filter(|point| !point.trim().is_empty()) {
                coordinates.push(parse_coordinate(point, ARG_VIA)?);
            }
        }
        coordinates.push(parse_coordinate(&to, ARG_TO)?);

        let constraint = parse_constraint(
            args.max_tolls,
            args.max_budget,
            args.max_budget_percentage,
        )?;
        let vehicle_class = match &args.vehicle_class {
            Some(label) => label.parse()?,
            None => VehicleClass::default(),
        };

        let ors = ors_config(
            args.ors_base_url,
            args.ors_profile,
            args.ors_api_key,
            args.ors_timeout_secs,
        );

        Ok(Self {
            catalog,
            tariffs,
            coordinates,
            constraint,
            vehicle_class,
            max_comb_size: args.max_comb_size.unwrap_or(DEFAULT_MAX_COMB_SIZE),
            solver_config: args.solver_config,
            ors,
            output: args.output,
        })
    }
}

fn parse_coordinate(raw: &str, field: &'static str) -> Result<Coord<f64>, CliError> {
    let invalid = || CliError::InvalidCoordinate {
        field,
        value: raw.to_owned(),
    };
    let (lon, lat) = raw.split_once(',').ok_or_else(invalid)?;
    let x = lon.trim().parse::<f64>().map_err(|_| invalid())?;
    let y = lat.trim().parse::<f64>().map_err(|_| invalid())?;
    Ok(Coord { x, y })
}

fn parse_constraint(
    max_tolls: Option<i64>,
    max_budget: Option<f64>,
    max_budget_percentage: Option<f64>,
) -> Result<Constraint, CliError> {
    match (max_tolls, max_budget, max_budget_percentage) {
        (Some(count), None, None) => Constraint::max_toll_count(count).map_err(CliError::from),
        (None, Some(euros), None) => {
            Constraint::max_budget_absolute(euros).map_err(CliError::from)
        }
        (None, None, Some(share)) => {
            Constraint::max_budget_percentage(share).map_err(CliError::from)
        }
        (None, None, None) => Err(CliError::MissingConstraint),
        _ => Err(CliError::ConflictingConstraints),
    }
}

fn ors_config(
    base_url: Option<String>,
    profile: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
) -> OrsRouteProviderConfig {
    let mut config =
        base_url.map_or_else(OrsRouteProviderConfig::default, OrsRouteProviderConfig::new);
    if let Some(name) = profile {
        config = config.with_profile(name);
    }
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }
    if let Some(secs) = timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    config
}

/// Builds an optimiser for the current invocation.
pub(super) trait OptimizerBuilder {
    fn build(&self, config: &OptimizeConfig) -> Result<Box<dyn Optimizer>, CliError>;
}

/// Wires the ORS provider, JSON catalog and tariff table into a
/// [`ConstraintResolver`].
pub(super) struct DefaultOptimizerBuilder;

impl OptimizerBuilder for DefaultOptimizerBuilder {
    fn build(&self, config: &OptimizeConfig) -> Result<Box<dyn Optimizer>, CliError> {
        let catalog = JsonTollCatalog::load(&config.catalog).map_err(CliError::LoadCatalog)?;
        let tariffs = TariffTable::load(&config.tariffs).map_err(CliError::LoadTariffs)?;
        let solver_config = load_solver_config(config.solver_config.as_deref())?;
        let provider = OrsRouteProvider::with_config(config.ors.clone()).map_err(|source| {
            CliError::BuildRouteProvider {
                base_url: config.ors.base_url.clone(),
                source,
            }
        })?;
        info!(
            "loaded {} tolls and {} tariff cells; routing through {}",
            catalog.len(),
            tariffs.len(),
            config.ors.directions_url()
        );
        let resolver =
            ConstraintResolver::new(provider, catalog, tariffs).with_config(solver_config)?;
        Ok(Box::new(resolver))
    }
}

/// Loads solver thresholds, falling back to the defaults without a file.
pub(super) fn load_solver_config(path: Option<&Utf8Path>) -> Result<SolverConfig, CliError> {
    let Some(file) = path else {
        return Ok(SolverConfig::default());
    };
    let text = tollgate_fs::read_utf8(file).map_err(|source| CliError::ReadSolverConfig {
        path: file.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::ParseSolverConfig {
        path: file.to_path_buf(),
        source,
    })
}

pub(super) fn run_optimize(args: OptimizeArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    let builder = DefaultOptimizerBuilder;
    run_optimize_with(args, &builder, &mut stdout)
}

pub(super) fn run_optimize_with(
    args: OptimizeArgs,
    builder: &dyn OptimizerBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = resolve_optimize_config(args)?;
    let result = execute_optimize(&config, builder)?;
    let payload = serde_json::to_string_pretty(&result).map_err(CliError::SerialiseResult)?;
    match &config.output {
        Some(path) => tollgate_fs::write_utf8(path, &format!("{payload}\n")).map_err(|source| {
            CliError::WriteOutputFile {
                path: path.clone(),
                source,
            }
        }),
        None => write_payload(writer, &payload),
    }
}

fn resolve_optimize_config(args: OptimizeArgs) -> Result<OptimizeConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

fn execute_optimize(
    config: &OptimizeConfig,
    builder: &dyn OptimizerBuilder,
) -> Result<OptimizationResult, CliError> {
    let request = config.request();
    request.validate().map_err(CliError::InvalidRequest)?;
    let optimizer = builder.build(config)?;
    let result = optimizer.optimize(&request).map_err(CliError::Optimize)?;
    info!(
        "finished with {} after {} route requests in {:.1?}",
        result.status.as_str(),
        result.stats.route_requests,
        result.stats.elapsed
    );
    Ok(result)
}

fn write_payload(writer: &mut dyn Write, payload: &str) -> Result<(), CliError> {
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<OptimizeConfig, CliError> {
    let merged = OptimizeArgs::merge_from_layers(layers).map_err(CliError::from)?;
    OptimizeConfig::try_from(merged)
}
