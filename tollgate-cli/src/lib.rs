//! Command-line interface for the Tollgate route optimiser.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod optimize;

pub use error::CliError;
use optimize::{OptimizeArgs, run_optimize};

pub(crate) const ARG_CATALOG: &str = "catalog";
pub(crate) const ARG_TARIFFS: &str = "tariffs";
pub(crate) const ARG_FROM: &str = "from";
pub(crate) const ARG_TO: &str = "to";
pub(crate) const ARG_VIA: &str = "via";
pub(crate) const ARG_MAX_TOLLS: &str = "max-tolls";
pub(crate) const ARG_MAX_BUDGET: &str = "max-budget";
pub(crate) const ARG_MAX_BUDGET_PERCENTAGE: &str = "max-budget-percentage";
pub(crate) const ARG_VEHICLE_CLASS: &str = "vehicle-class";
pub(crate) const ARG_MAX_COMB_SIZE: &str = "max-comb-size";
pub(crate) const ARG_SOLVER_CONFIG: &str = "solver-config";
pub(crate) const ARG_ORS_BASE_URL: &str = "ors-base-url";
pub(crate) const ARG_ORS_PROFILE: &str = "ors-profile";
pub(crate) const ARG_ORS_API_KEY: &str = "ors-api-key";
pub(crate) const ARG_ORS_TIMEOUT_SECS: &str = "ors-timeout-secs";
pub(crate) const ARG_OUTPUT: &str = "output";
pub(crate) const ENV_CATALOG: &str = "TOLLGATE_CMDS_OPTIMIZE_CATALOG";
pub(crate) const ENV_TARIFFS: &str = "TOLLGATE_CMDS_OPTIMIZE_TARIFFS";
pub(crate) const ENV_FROM: &str = "TOLLGATE_CMDS_OPTIMIZE_FROM";
pub(crate) const ENV_TO: &str = "TOLLGATE_CMDS_OPTIMIZE_TO";

/// Run the Tollgate CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when argument parsing, configuration, loading or the
/// optimisation itself fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Optimize(args) => run_optimize(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "tollgate",
    about = "Find routes that respect a toll count or toll budget",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Optimise a route between waypoints under a toll constraint.
    Optimize(OptimizeArgs),
}

#[cfg(test)]
mod tests;
