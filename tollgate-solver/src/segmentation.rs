//! Route assembly from independently routed segments.
//!
//! When avoiding whole combinations does not reach the limit, the planner
//! splits the journey at the motorway junction preceding each avoided toll
//! and routes every piece on its own, asking the engine to avoid only the
//! tolls that piece must skip. Pieces are stitched into one route and
//! re-priced.
//!
//! A closed-system journey cannot be interrupted: a plan whose assembled
//! route would leave a toll-free stretch between two retained CLOSED tolls
//! is rejected, both when predicted from the base route and when observed
//! on the assembled result.

use std::collections::HashSet;

use geo::{Coord, LineString};
use log::debug;
use tollgate_core::geometry::{haversine_m, position_along};
use tollgate_core::{Limit, RouteAttempt, RoutePlan, TelemetryEvent, TollCandidate, TollId};

use crate::combination::{Combination, Flow, combinations_of_size};
use crate::session::Session;

/// True when removing `avoided` from `route` would put a toll-free stretch
/// between two retained CLOSED tolls.
///
/// `route` is the base route's tolls in route order.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use tollgate_core::{TollCandidate, TollId, TollSystem};
/// use tollgate_solver::breaks_closed_sequence;
///
/// let toll = |id: &str, system| TollCandidate::new(id, Coord { x: 0.0, y: 0.0 }, "op", system);
/// let route = [
///     toll("A", TollSystem::Closed),
///     toll("B", TollSystem::Open),
///     toll("C", TollSystem::Closed),
/// ];
/// assert!(breaks_closed_sequence(&route, &[TollId::from("B")]));
/// assert!(!breaks_closed_sequence(&route, &[TollId::from("C")]));
/// ```
#[must_use]
pub fn breaks_closed_sequence(route: &[TollCandidate], avoided: &[TollId]) -> bool {
    let skipped: HashSet<&TollId> = avoided.iter().collect();
    route.iter().enumerate().any(|(position, toll)| {
        if !skipped.contains(&toll.id) {
            return false;
        }
        let before = route
            .iter()
            .take(position)
            .rev()
            .find(|other| !skipped.contains(&other.id));
        let after = route
            .iter()
            .skip(position.saturating_add(1))
            .find(|other| !skipped.contains(&other.id));
        matches!((before, after), (Some(a), Some(b)) if a.is_closed() && b.is_closed())
    })
}

/// Why a segmentation plan was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Rejection {
    PredictedBreak,
    MissingJunction(TollId),
    JunctionOffRoute(String),
    JunctionsOutOfOrder,
    Routing { segment: usize, message: String },
    Discontinuity { segment: usize },
    ObservedBreak,
    Pricing(String),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PredictedBreak => f.write_str("would interrupt a closed toll sequence"),
            Self::MissingJunction(toll) => write!(f, "no junction known before {toll}"),
            Self::JunctionOffRoute(id) => write!(f, "junction {id} is not on the base route"),
            Self::JunctionsOutOfOrder => f.write_str("junctions are not in route order"),
            Self::Routing { segment, message } => {
                write!(f, "segment {segment} could not be routed: {message}")
            }
            Self::Discontinuity { segment } => {
                write!(f, "segment {segment} does not start where the previous one ended")
            }
            Self::ObservedBreak => f.write_str("assembled route interrupts a closed toll sequence"),
            Self::Pricing(message) => write!(f, "assembled route could not be priced: {message}"),
        }
    }
}

/// One routed piece of an assembled route.
struct Leg {
    from: Coord<f64>,
    to: Coord<f64>,
    avoid: Vec<TollCandidate>,
}

/// Counters from a segmentation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SegmentReport {
    pub(crate) tried: usize,
    pub(crate) rejected: usize,
    pub(crate) timed_out: bool,
    pub(crate) stopped: bool,
}

/// Plans and assembles segmented routes for a two-point request.
pub(crate) struct SegmentationPlanner<'s, 'a> {
    session: &'s Session<'a>,
}

impl<'s, 'a> SegmentationPlanner<'s, 'a> {
    pub(crate) const fn new(session: &'s Session<'a>) -> Self {
        Self { session }
    }

    /// Try plans in preference order, passing each assembled attempt to
    /// `on_attempt`.
    pub(crate) fn run<F>(
        &self,
        base: &RouteAttempt,
        limit: &Limit,
        ranked: &[TollCandidate],
        max_size: usize,
        mut on_attempt: F,
    ) -> SegmentReport
    where
        F: FnMut(RouteAttempt) -> Flow,
    {
        let mut report = SegmentReport::default();
        if self.session.waypoints.len() != 2 {
            debug!("segmentation skipped for a request with intermediate waypoints");
            return report;
        }
        for plan in candidate_plans(base, limit, ranked, max_size) {
            if report.tried >= self.session.config.max_segment_plans {
                break;
            }
            if self.session.expired() {
                report.timed_out = true;
                break;
            }
            if breaks_closed_sequence(&base.tolls, &plan.signature) {
                self.reject(&plan.signature, &Rejection::PredictedBreak);
                report.rejected = report.rejected.saturating_add(1);
                continue;
            }
            report.tried = report.tried.saturating_add(1);
            match self.assemble(base, &plan) {
                Ok(attempt) => {
                    if on_attempt(attempt) == Flow::Stop {
                        report.stopped = true;
                        break;
                    }
                }
                Err(rejection) => {
                    self.reject(&plan.signature, &rejection);
                    report.rejected = report.rejected.saturating_add(1);
                }
            }
        }
        report
    }

    fn reject(&self, avoided: &[TollId], rejection: &Rejection) {
        debug!("segment plan {avoided:?} rejected: {rejection}");
        self.session
            .telemetry
            .record(TelemetryEvent::SegmentPlanRejected {
                avoided: avoided.to_vec(),
                reason: rejection.to_string(),
            });
    }

    fn assemble(&self, base: &RouteAttempt, plan: &Combination) -> Result<RouteAttempt, Rejection> {
        let legs = self.legs(base, plan)?;
        let mut coords: Vec<Coord<f64>> = Vec::new();
        let mut distance_m = 0.0_f64;
        let mut duration = std::time::Duration::ZERO;
        let mut leg_tolls: Vec<Vec<TollCandidate>> = Vec::with_capacity(legs.len());

        for (segment, leg) in legs.iter().enumerate() {
            let directive = self.session.zones.build(&leg.avoid);
            let routed = self
                .session
                .route(&[leg.from, leg.to], &directive)
                .map_err(|err| Rejection::Routing {
                    segment,
                    message: err.to_string(),
                })?;
            let mut points = routed.geometry.0.iter().copied();
            if let Some(last) = coords.last().copied() {
                let first = points.next().ok_or(Rejection::Discontinuity { segment })?;
                if haversine_m(last, first) > self.session.config.continuity_tolerance_m {
                    return Err(Rejection::Discontinuity { segment });
                }
            }
            coords.extend(points);
            distance_m = add_metres(distance_m, routed.distance_m);
            duration = duration.saturating_add(routed.duration);
            leg_tolls.push(self.session.coster.locate(&routed.geometry));
        }

        if leaves_free_gap(&leg_tolls) {
            return Err(Rejection::ObservedBreak);
        }
        let geometry = LineString::new(coords);
        let located = self.session.coster.locate(&geometry);
        let present: HashSet<&TollId> = located.iter().map(|toll| &toll.id).collect();
        let missing: Vec<TollId> = base
            .toll_ids()
            .filter(|id| !present.contains(id))
            .cloned()
            .collect();
        if breaks_closed_sequence(&base.tolls, &missing) {
            return Err(Rejection::ObservedBreak);
        }
        let (tolls, total) = self
            .session
            .coster
            .price(located)
            .map_err(|err| Rejection::Pricing(err.to_string()))?;
        let assembled = RoutePlan::new(geometry, distance_m, duration);
        Ok(
            RouteAttempt::from_plan(self.session.waypoints.to_vec(), assembled, tolls, total)
                .with_avoided(plan.signature.clone())
                .with_segments(legs.len()),
        )
    }

    /// Split the journey at the junction before each avoided toll. Avoided
    /// tolls sharing a junction share a leg.
    fn legs(&self, base: &RouteAttempt, plan: &Combination) -> Result<Vec<Leg>, Rejection> {
        let (Some(start), Some(end)) = (
            self.session.waypoints.first().copied(),
            self.session.waypoints.last().copied(),
        ) else {
            return Err(Rejection::JunctionsOutOfOrder);
        };
        let mut avoided = plan.tolls.clone();
        avoided.sort_by_key(|toll| toll.route_index);

        let mut splits: Vec<(String, f64, Coord<f64>, Vec<TollCandidate>)> = Vec::new();
        for toll in avoided {
            let junction = self
                .session
                .coster
                .junction_before(&toll.id)
                .ok_or_else(|| Rejection::MissingJunction(toll.id.clone()))?;
            if let Some(last) = splits.last_mut() {
                if last.0 == junction.id {
                    last.3.push(toll);
                    continue;
                }
            }
            let fraction = position_along(
                &base.geometry,
                junction.location,
                self.session.config.toll_buffer_m,
            )
            .ok_or_else(|| Rejection::JunctionOffRoute(junction.id.clone()))?;
            if splits.last().is_some_and(|last| last.1 >= fraction) {
                return Err(Rejection::JunctionsOutOfOrder);
            }
            splits.push((junction.id, fraction, junction.location, vec![toll]));
        }

        let mut legs = Vec::with_capacity(splits.len().saturating_add(1));
        let mut from = start;
        let mut pending_avoid = Vec::new();
        for (_, _, location, tolls) in splits {
            legs.push(Leg {
                from,
                to: location,
                avoid: std::mem::take(&mut pending_avoid),
            });
            from = location;
            pending_avoid = tolls;
        }
        legs.push(Leg {
            from,
            to: end,
            avoid: pending_avoid,
        });
        Ok(legs)
    }
}

#[expect(clippy::float_arithmetic, reason = "segment lengths are summed")]
fn add_metres(total: f64, leg: f64) -> f64 {
    total + leg
}

/// True when a toll-free leg sits between legs whose nearest tolls are both
/// CLOSED.
fn leaves_free_gap(leg_tolls: &[Vec<TollCandidate>]) -> bool {
    leg_tolls.iter().enumerate().any(|(position, tolls)| {
        if !tolls.is_empty() {
            return false;
        }
        let before = leg_tolls
            .iter()
            .take(position)
            .rev()
            .find_map(|leg| leg.last());
        let after = leg_tolls
            .iter()
            .skip(position.saturating_add(1))
            .find_map(|leg| leg.first());
        matches!((before, after), (Some(a), Some(b)) if a.is_closed() && b.is_closed())
    })
}

/// Avoidance sets worth segmenting for, most promising first.
///
/// A toll-count limit needs exactly `count - max` avoided tolls; a budget
/// needs sets whose estimated saving brings the base cost within it. Sets
/// avoiding fewer OPEN tolls come first, then larger savings.
fn candidate_plans(
    base: &RouteAttempt,
    limit: &Limit,
    ranked: &[TollCandidate],
    max_size: usize,
) -> Vec<Combination> {
    let mut plans = match *limit {
        Limit::Count(max_tolls) => {
            let allowed = usize::try_from(max_tolls).unwrap_or(usize::MAX);
            match base.toll_count.checked_sub(allowed) {
                Some(excess) if excess > 0 => combinations_of_size(ranked, excess),
                _ => Vec::new(),
            }
        }
        Limit::Budget(budget) => (1..=max_size)
            .flat_map(|size| combinations_of_size(ranked, size))
            .filter(|plan| base.total_cost.saturating_sub(plan.estimated_saving) <= budget)
            .collect(),
    };
    plans.sort_by(|a, b| {
        open_count(a)
            .cmp(&open_count(b))
            .then_with(|| b.estimated_saving.cmp(&a.estimated_saving))
    });
    plans
}

fn open_count(plan: &Combination) -> usize {
    plan.tolls.iter().filter(|toll| !toll.is_closed()).count()
}
