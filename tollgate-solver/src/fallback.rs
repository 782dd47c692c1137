//! The tiered fallback state machine.
//!
//! ```text
//! Priority1Search --compliant--> Done
//!        | exhausted
//!        v
//! Priority2Backup --compliant--> Done
//!        | exhausted
//!        v
//! BaselineFallback ------------> Done
//! ```
//!
//! A timeout in either search state jumps straight to `BaselineFallback`.

use std::sync::Arc;
use std::time::Instant;

use log::debug;
use tollgate_core::{SearchState, Telemetry, TelemetryEvent};

/// Result of working through the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierOutcome {
    /// At least one attempt met the tier's limit.
    Compliant,
    /// The tier's search finished without a compliant attempt.
    Exhausted,
    /// The session deadline expired.
    TimedOut,
}

/// Drives [`SearchState`] transitions and reports each one.
pub struct FallbackController {
    state: SearchState,
    telemetry: Arc<dyn Telemetry>,
    started: Instant,
}

impl FallbackController {
    /// Controller in [`SearchState::Priority1Search`].
    #[must_use]
    pub fn new(telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            state: SearchState::Priority1Search,
            telemetry,
            started: Instant::now(),
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SearchState {
        self.state
    }

    /// Apply `outcome` to the current state. `attempts` is the number of
    /// route attempts evaluated so far and is reported with the transition.
    pub fn advance(&mut self, outcome: TierOutcome, attempts: usize) -> SearchState {
        let next = next_state(self.state, outcome);
        if next != self.state {
            debug!("search state {:?} -> {:?} ({outcome:?})", self.state, next);
            self.telemetry.record(TelemetryEvent::Transition {
                from: self.state,
                to: next,
                attempts,
                elapsed: self.started.elapsed(),
            });
            self.state = next;
        }
        next
    }
}

const fn next_state(state: SearchState, outcome: TierOutcome) -> SearchState {
    match (state, outcome) {
        (SearchState::Done | SearchState::BaselineFallback, _)
        | (SearchState::Priority1Search | SearchState::Priority2Backup, TierOutcome::Compliant) => {
            SearchState::Done
        }
        (SearchState::Priority1Search, TierOutcome::Exhausted) => SearchState::Priority2Backup,
        (SearchState::Priority1Search | SearchState::Priority2Backup, _) => {
            SearchState::BaselineFallback
        }
    }
}

impl std::fmt::Debug for FallbackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackController")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tollgate_core::test_support::RecordingTelemetry;

    use super::*;

    #[rstest]
    #[case(SearchState::Priority1Search, TierOutcome::Compliant, SearchState::Done)]
    #[case(SearchState::Priority1Search, TierOutcome::Exhausted, SearchState::Priority2Backup)]
    #[case(SearchState::Priority1Search, TierOutcome::TimedOut, SearchState::BaselineFallback)]
    #[case(SearchState::Priority2Backup, TierOutcome::Compliant, SearchState::Done)]
    #[case(SearchState::Priority2Backup, TierOutcome::Exhausted, SearchState::BaselineFallback)]
    #[case(SearchState::Priority2Backup, TierOutcome::TimedOut, SearchState::BaselineFallback)]
    #[case(SearchState::BaselineFallback, TierOutcome::Exhausted, SearchState::Done)]
    #[case(SearchState::Done, TierOutcome::Exhausted, SearchState::Done)]
    fn transition_table(
        #[case] from: SearchState,
        #[case] outcome: TierOutcome,
        #[case] to: SearchState,
    ) {
        assert_eq!(next_state(from, outcome), to);
    }

    #[rstest]
    fn full_walk_reports_every_transition() {
        let telemetry = Arc::new(RecordingTelemetry::default());
        let mut controller = FallbackController::new(telemetry.clone());
        controller.advance(TierOutcome::Exhausted, 4);
        controller.advance(TierOutcome::Exhausted, 9);
        controller.advance(TierOutcome::Compliant, 9);
        assert_eq!(controller.state(), SearchState::Done);

        let path: Vec<_> = telemetry
            .events()
            .into_iter()
            .filter_map(|event| match event {
                TelemetryEvent::Transition { from, to, attempts, .. } => Some((from, to, attempts)),
                _ => None,
            })
            .collect();
        assert_eq!(
            path,
            [
                (SearchState::Priority1Search, SearchState::Priority2Backup, 4),
                (SearchState::Priority2Backup, SearchState::BaselineFallback, 9),
                (SearchState::BaselineFallback, SearchState::Done, 9),
            ]
        );
    }

    #[rstest]
    fn done_is_terminal_and_silent() {
        let telemetry = Arc::new(RecordingTelemetry::default());
        let mut controller = FallbackController::new(telemetry.clone());
        controller.advance(TierOutcome::Compliant, 1);
        controller.advance(TierOutcome::TimedOut, 1);
        assert_eq!(controller.state(), SearchState::Done);
        assert_eq!(telemetry.events().len(), 1);
    }
}
