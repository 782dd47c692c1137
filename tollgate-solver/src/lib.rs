//! Toll-constraint search for the Tollgate engine.
//!
//! This crate provides [`ConstraintResolver`], the default implementation of
//! the [`Optimizer`](tollgate_core::Optimizer) trait. A session fetches the
//! unrestricted base route, resolves the caller's constraint against it, and
//! then works through three tiers:
//!
//! 1. a strict search that asks the routing engine to avoid combinations of
//!    the costliest tolls, followed by segmented routing when whole-route
//!    avoidance falls short;
//! 2. a backup search against a relaxed limit;
//! 3. the base route itself.
//!
//! Routing is synchronous and may be slow, so every search stage checks the
//! session deadline between batches and bounds the number of combinations
//! it routes.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod aggregator;
mod combination;
mod config;
mod costing;
mod fallback;
mod resolver;
mod segmentation;
mod session;
mod tiers;

pub use aggregator::{LeaderSnapshot, LeaderUpdate, ResultAggregator};
pub use combination::{Combination, combinations_of_size, generate_combinations, rank_candidates};
pub use config::{SolverConfig, SolverConfigError};
pub use fallback::{FallbackController, TierOutcome};
pub use resolver::ConstraintResolver;
pub use segmentation::breaks_closed_sequence;
pub use tiers::relaxed_limits;
