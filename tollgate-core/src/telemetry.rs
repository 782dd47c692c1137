//! Fire-and-forget observability hooks for the search.

use std::time::Duration;

use log::{debug, info, warn};

use crate::{CacheStats, Cost, Limit, OptimizationStatus, SearchState, TollId};

/// Something worth reporting while a session runs.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// A session resolved its limit against the base route.
    SessionStarted {
        /// Resolved strict limit.
        limit: Limit,
        /// Tolls on the base route.
        base_toll_count: usize,
        /// Cost of the base route.
        base_cost: Cost,
    },
    /// Periodic progress of a combination search.
    SearchProgress {
        /// Combinations evaluated so far.
        tested: usize,
        /// Combinations generated for the current tier.
        generated: usize,
        /// Time since the session started.
        elapsed: Duration,
    },
    /// A combination could not be evaluated and was skipped.
    CombinationSkipped {
        /// Signature of the skipped combination.
        signature: Vec<TollId>,
        /// Failure description.
        reason: String,
    },
    /// A segmentation plan was rejected.
    SegmentPlanRejected {
        /// Tolls the plan tried to avoid.
        avoided: Vec<TollId>,
        /// Rejection reason.
        reason: String,
    },
    /// The fallback state machine moved between states.
    Transition {
        /// State left.
        from: SearchState,
        /// State entered.
        to: SearchState,
        /// Route attempts evaluated so far.
        attempts: usize,
        /// Time since the session started.
        elapsed: Duration,
    },
    /// Cache counters at the end of a session.
    CacheSnapshot(CacheStats),
    /// The session finished.
    SessionFinished {
        /// Final status.
        status: OptimizationStatus,
        /// Total session time.
        elapsed: Duration,
    },
}

/// Receives [`TelemetryEvent`]s. Implementations must not block.
pub trait Telemetry: Send + Sync {
    /// Record an event.
    fn record(&self, event: TelemetryEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Writes events through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn record(&self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::SessionStarted {
                limit,
                base_toll_count,
                base_cost,
            } => info!("session started: limit {limit}, base route {base_toll_count} tolls, {base_cost}"),
            TelemetryEvent::SearchProgress {
                tested,
                generated,
                elapsed,
            } => debug!("tested {tested}/{generated} combinations in {elapsed:?}"),
            TelemetryEvent::CombinationSkipped { signature, reason } => {
                warn!("skipping combination {signature:?}: {reason}");
            }
            TelemetryEvent::SegmentPlanRejected { avoided, reason } => {
                debug!("segment plan avoiding {avoided:?} rejected: {reason}");
            }
            TelemetryEvent::Transition {
                from,
                to,
                attempts,
                elapsed,
            } => info!("{from:?} -> {to:?} after {attempts} attempts in {elapsed:?}"),
            TelemetryEvent::CacheSnapshot(stats) => debug!(
                "cost cache: {} hits, {} misses, {} evictions, {} entries",
                stats.hits, stats.misses, stats.evictions, stats.entries
            ),
            TelemetryEvent::SessionFinished { status, elapsed } => {
                info!("session finished with {status} in {elapsed:?}");
            }
        }
    }
}
