//! Request road routes from an external routing engine.
//!
//! The [`RouteProvider`] trait abstracts the routing engine. Callers pass the
//! waypoints and an [`AvoidDirective`] and receive a [`RoutePlan`](crate::RoutePlan)
//! with the geometry and totals. Errors distinguish "no route exists" from
//! an engine that is unreachable or misbehaving.

mod error;
mod provider;

pub use error::RouteError;
pub use provider::{AvoidDirective, RouteProvider};
