//! Behaviour-driven step definitions driving the optimize CLI scenarios.

use super::helpers::{CorridorBuilder, InputFiles};
use super::*;
use crate::optimize::{OptimizeConfig, run_optimize_with};
use camino::Utf8PathBuf;
use clap::Parser;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use std::sync::Arc;
use tollgate_core::test_support::CorridorWorld;
use tollgate_core::{OptimizationResult, TollSystem, VehicleClass};

#[derive(Debug)]
struct OptimizeWorld {
    inputs: InputFiles,
    output: Utf8PathBuf,
    from: RefCell<String>,
    tolls: RefCell<Vec<(u64, f64)>>,
    cli_args: RefCell<Vec<String>>,
    stdout: RefCell<Vec<u8>>,
    seen: RefCell<Option<OptimizeConfig>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl OptimizeWorld {
    fn new() -> Self {
        let inputs = InputFiles::new();
        let output = inputs.root.join("out").join("result.json");
        Self {
            inputs,
            output,
            from: RefCell::new("0,45".to_owned()),
            tolls: RefCell::new(Vec::new()),
            cli_args: RefCell::new(Vec::new()),
            stdout: RefCell::new(Vec::new()),
            seen: RefCell::new(None),
            result: RefCell::new(None),
        }
    }

    fn corridor(&self) -> CorridorWorld {
        self.tolls
            .borrow()
            .iter()
            .enumerate()
            .fold(CorridorWorld::new(), |world, (index, (cents, x))| {
                let id = format!("T{}", index + 1);
                world.with_toll(&id, *x, TollSystem::Open, *cents)
            })
    }

    fn build_command_line(&self) -> Vec<String> {
        let mut argv = vec![
            "tollgate".to_owned(),
            "optimize".to_owned(),
            format!("--{ARG_CATALOG}"),
            self.inputs.catalog.as_str().to_owned(),
            format!("--{ARG_TARIFFS}"),
            self.inputs.tariffs.as_str().to_owned(),
            format!("--{ARG_FROM}"),
            self.from.borrow().clone(),
            format!("--{ARG_TO}"),
            "1,45".to_owned(),
        ];
        argv.extend(self.cli_args.borrow().iter().cloned());
        argv
    }

    fn push_args<const N: usize>(&self, args: [String; N]) {
        self.cli_args.borrow_mut().extend(args);
    }

    fn printed_result(&self) -> OptimizationResult {
        let stdout = String::from_utf8(self.stdout.borrow().clone()).expect("stdout utf-8");
        serde_json::from_str(&stdout).expect("output should be a JSON optimisation result")
    }

    fn error(&self) -> std::cell::Ref<'_, CliError> {
        std::cell::Ref::map(self.result.borrow(), |result| {
            result
                .as_ref()
                .expect("result recorded")
                .as_ref()
                .expect_err("expected error")
        })
    }
}

#[fixture]
fn world() -> OptimizeWorld {
    OptimizeWorld::new()
}

#[given("input files exist on disk")]
fn input_files_exist(#[from(world)] world: &OptimizeWorld) {
    assert!(world.inputs.catalog.is_file(), "catalog should exist");
    assert!(world.inputs.tariffs.is_file(), "tariffs should exist");
}

#[given("a corridor with an open toll costing {cents} cents at {x}")]
fn corridor_toll(#[from(world)] world: &OptimizeWorld, cents: u64, x: f64) {
    world.tolls.borrow_mut().push((cents, x));
}

#[given("I ask for at most {count} tolls")]
fn ask_for_toll_limit(#[from(world)] world: &OptimizeWorld, count: u32) {
    world.push_args([format!("--{ARG_MAX_TOLLS}"), count.to_string()]);
}

#[given("I ask for a budget of {euros} euros")]
fn ask_for_budget(#[from(world)] world: &OptimizeWorld, euros: u32) {
    world.push_args([format!("--{ARG_MAX_BUDGET}"), euros.to_string()]);
}

#[given("I pass the vehicle class {class}")]
fn pass_vehicle_class(#[from(world)] world: &OptimizeWorld, class: String) {
    world.push_args([format!("--{ARG_VEHICLE_CLASS}"), class]);
}

#[given("I ask for the result in a file")]
fn ask_for_output_file(#[from(world)] world: &OptimizeWorld) {
    world.push_args([format!("--{ARG_OUTPUT}"), world.output.as_str().to_owned()]);
}

#[given("the catalog file is missing")]
fn catalog_missing(#[from(world)] world: &OptimizeWorld) {
    std::fs::remove_file(&world.inputs.catalog).expect("remove catalog");
}

#[given("I start from {value}")]
fn start_from(#[from(world)] world: &OptimizeWorld, value: String) {
    world.from.replace(value);
}

#[when("I run the optimize command")]
fn run_optimize_command(#[from(world)] world: &OptimizeWorld) {
    let invocation = world.build_command_line();
    let builder = CorridorBuilder {
        world: Arc::new(world.corridor()),
        seen: &world.seen,
    };
    let outcome = Cli::try_parse_from(invocation)
        .map_err(CliError::from)
        .and_then(|cli| {
            let Command::Optimize(args) = cli.command;
            let mut buffer = world.stdout.borrow_mut();
            run_optimize_with(args, &builder, &mut *buffer)
        });
    world.result.replace(Some(outcome));
}

#[then("the command succeeds with status {status}")]
fn command_succeeds(#[from(world)] world: &OptimizeWorld, status: String) {
    let borrowed = world.result.borrow();
    let result = borrowed.as_ref().expect("result recorded");
    if let Err(err) = result {
        panic!("expected success, found {err:?}");
    }
    assert_eq!(world.printed_result().status.as_str(), status);
}

#[then("every leader has at most {count} tolls")]
fn leaders_within_limit(#[from(world)] world: &OptimizeWorld, count: usize) {
    let result = world.printed_result();
    assert_eq!(result.leaders().count(), 3);
    assert!(result.leaders().all(|leader| leader.attempt.toll_count <= count));
}

#[then("the cheapest route costs at most {cents} cents")]
fn cheapest_within_budget(#[from(world)] world: &OptimizeWorld, cents: u64) {
    let result = world.printed_result();
    let cheapest = result.cheapest.expect("cheapest leader");
    assert!(cheapest.attempt.total_cost.cents() <= cents);
}

#[then("the optimiser was built for vehicle class {class}")]
fn built_for_vehicle_class(#[from(world)] world: &OptimizeWorld, class: String) {
    let seen = world.seen.borrow();
    let config = seen.as_ref().expect("optimiser should have been built");
    let expected: VehicleClass = class.parse().expect("known vehicle class");
    assert_eq!(config.vehicle_class, expected);
}

#[then("the result file holds status {status}")]
fn result_file_holds(#[from(world)] world: &OptimizeWorld, status: String) {
    let text = tollgate_fs::read_utf8(&world.output).expect("result file written");
    let result: OptimizationResult = serde_json::from_str(&text).expect("result file is JSON");
    assert_eq!(result.status.as_str(), status);
}

#[then("nothing is printed")]
fn nothing_printed(#[from(world)] world: &OptimizeWorld) {
    assert!(world.stdout.borrow().is_empty());
}

#[then("the command fails because the constraints conflict")]
fn fails_with_conflicting_constraints(#[from(world)] world: &OptimizeWorld) {
    match &*world.error() {
        CliError::ConflictingConstraints => {}
        other => panic!("expected ConflictingConstraints, found {other:?}"),
    }
}

#[then("the command fails because the catalog is missing")]
fn fails_with_missing_catalog(#[from(world)] world: &OptimizeWorld) {
    match &*world.error() {
        CliError::MissingSourceFile { field, path } => {
            assert_eq!(*field, ARG_CATALOG);
            assert_eq!(*path, world.inputs.catalog);
        }
        other => panic!("expected MissingSourceFile, found {other:?}"),
    }
}

#[then("the command fails because the from waypoint is invalid")]
fn fails_with_invalid_waypoint(#[from(world)] world: &OptimizeWorld) {
    match &*world.error() {
        CliError::InvalidCoordinate { field, value } => {
            assert_eq!(*field, ARG_FROM);
            assert_eq!(value, "somewhere");
        }
        other => panic!("expected InvalidCoordinate, found {other:?}"),
    }
}

macro_rules! register_optimize_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/optimize_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: OptimizeWorld) {
            let _ = world;
        }
    };
}

register_optimize_scenario!(optimise_toll_limit, "optimising under a toll limit");
register_optimize_scenario!(optimise_budget, "optimising under an absolute budget");
register_optimize_scenario!(optimise_vehicle_class, "passing the vehicle class through");
register_optimize_scenario!(optimise_to_file, "writing the result to a file");
register_optimize_scenario!(reject_conflicts, "rejecting conflicting constraints");
register_optimize_scenario!(reject_missing_catalog, "rejecting a missing catalog");
register_optimize_scenario!(reject_bad_waypoint, "rejecting a malformed waypoint");
