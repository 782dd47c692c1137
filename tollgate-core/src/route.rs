//! Routes returned by the routing engine and priced route attempts.

use std::time::Duration;

use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};

use crate::{Cost, Limit, TollCandidate, TollId};

/// Raw route geometry and totals as returned by a
/// [`RouteProvider`](crate::RouteProvider).
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    /// Route polyline (`x` = longitude, `y` = latitude).
    pub geometry: LineString<f64>,
    /// Total length in metres.
    pub distance_m: f64,
    /// Total travel time.
    pub duration: Duration,
}

impl RoutePlan {
    /// Bundle a geometry with its totals.
    #[must_use]
    pub const fn new(geometry: LineString<f64>, distance_m: f64, duration: Duration) -> Self {
        Self {
            geometry,
            distance_m,
            duration,
        }
    }
}

/// Compliance level an attempt was accepted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceTier {
    /// Meets the caller's constraint.
    Strict,
    /// Meets the constraint relaxed by one step.
    Relaxed,
    /// Unconstrained base route.
    Baseline,
}

/// A priced route produced during a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAttempt {
    /// Waypoints the route was requested for.
    pub waypoints: Vec<Coord<f64>>,
    /// Route polyline.
    pub geometry: LineString<f64>,
    /// Total length in metres.
    pub distance_m: f64,
    /// Total travel time.
    #[serde(with = "crate::serde_secs")]
    pub duration: Duration,
    /// Tolls crossed, in route order.
    pub tolls: Vec<TollCandidate>,
    /// Total toll cost.
    pub total_cost: Cost,
    /// Number of tolls crossed.
    pub toll_count: usize,
    /// Tier the attempt was graded at.
    pub tier: ComplianceTier,
    /// Tolls the routing engine was asked to avoid.
    pub avoided: Vec<TollId>,
    /// Number of independently routed segments; `1` for a single request.
    pub segments: usize,
}

impl RouteAttempt {
    /// Build an attempt from a routed plan and its priced tolls.
    #[must_use]
    pub fn from_plan(
        waypoints: Vec<Coord<f64>>,
        plan: RoutePlan,
        tolls: Vec<TollCandidate>,
        total_cost: Cost,
    ) -> Self {
        let toll_count = tolls.len();
        Self {
            waypoints,
            geometry: plan.geometry,
            distance_m: plan.distance_m,
            duration: plan.duration,
            tolls,
            total_cost,
            toll_count,
            tier: ComplianceTier::Strict,
            avoided: Vec::new(),
            segments: 1,
        }
    }

    /// Record the tolls that were avoided to produce this attempt.
    #[must_use]
    pub fn with_avoided(mut self, avoided: Vec<TollId>) -> Self {
        self.avoided = avoided;
        self
    }

    /// Record the number of assembled segments.
    #[must_use]
    pub const fn with_segments(mut self, segments: usize) -> Self {
        self.segments = segments;
        self
    }

    /// Re-grade the attempt at `tier`.
    #[must_use]
    pub const fn at_tier(mut self, tier: ComplianceTier) -> Self {
        self.tier = tier;
        self
    }

    /// True when the attempt satisfies `limit`.
    #[must_use]
    pub fn complies_with(&self, limit: &Limit) -> bool {
        limit.is_satisfied_by(self.toll_count, self.total_cost)
    }

    /// Toll identifiers in route order.
    pub fn toll_ids(&self) -> impl Iterator<Item = &TollId> {
        self.tolls.iter().map(|toll| &toll.id)
    }
}
