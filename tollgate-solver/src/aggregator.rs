//! Leader tracking per compliance tier.

use tollgate_core::{ComplianceTier, Leader, RouteAttempt};

/// Which leader slots an update replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeaderUpdate {
    /// The attempt became the fastest leader.
    pub fastest: bool,
    /// The attempt became the cheapest leader.
    pub cheapest: bool,
    /// The attempt became the fewest-tolls leader.
    pub min_tolls: bool,
}

impl LeaderUpdate {
    /// True when any slot changed.
    #[must_use]
    pub const fn any(self) -> bool {
        self.fastest || self.cheapest || self.min_tolls
    }
}

#[derive(Debug, Clone, Default)]
struct Slots {
    fastest: Option<RouteAttempt>,
    cheapest: Option<RouteAttempt>,
    min_tolls: Option<RouteAttempt>,
}

impl Slots {
    fn is_empty(&self) -> bool {
        self.fastest.is_none()
    }

    fn offer(&mut self, attempt: &RouteAttempt) -> LeaderUpdate {
        LeaderUpdate {
            fastest: replace_if(&mut self.fastest, attempt, |a| (a.duration, a.total_cost)),
            cheapest: replace_if(&mut self.cheapest, attempt, |a| (a.total_cost, a.duration)),
            min_tolls: replace_if(&mut self.min_tolls, attempt, |a| {
                (a.toll_count, a.total_cost, a.duration)
            }),
        }
    }
}

/// Replace `slot` when `attempt` is strictly better under `key`. The first
/// attempt seen wins ties.
fn replace_if<K, F>(slot: &mut Option<RouteAttempt>, attempt: &RouteAttempt, key: F) -> bool
where
    K: Ord,
    F: Fn(&RouteAttempt) -> K,
{
    let better = slot
        .as_ref()
        .is_none_or(|current| key(attempt) < key(current));
    if better {
        *slot = Some(attempt.clone());
    }
    better
}

/// Leaders of the best populated tier.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderSnapshot {
    /// Tier the leaders were accepted at.
    pub tier: ComplianceTier,
    /// Quickest attempt.
    pub fastest: Leader,
    /// Cheapest attempt.
    pub cheapest: Leader,
    /// Attempt with the fewest tolls.
    pub min_tolls: Leader,
}

/// Keeps the fastest, cheapest and fewest-tolls attempts for each
/// [`ComplianceTier`].
///
/// Attempts are cloned only when they take a slot, so a long search holds
/// at most three attempts per tier.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use geo::{Coord, LineString};
/// use tollgate_core::{ComplianceTier, Cost, RouteAttempt, RoutePlan};
/// use tollgate_solver::ResultAggregator;
///
/// let plan = RoutePlan::new(LineString::new(vec![Coord { x: 0.0, y: 0.0 }]), 1.0, Duration::from_secs(60));
/// let attempt = RouteAttempt::from_plan(Vec::new(), plan, Vec::new(), Cost::ZERO);
///
/// let mut aggregator = ResultAggregator::default();
/// assert!(aggregator.update(attempt, ComplianceTier::Relaxed).any());
/// let snapshot = aggregator.finalize().expect("one tier populated");
/// assert_eq!(snapshot.tier, ComplianceTier::Relaxed);
/// assert!(!snapshot.cheapest.compliant);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    strict: Slots,
    relaxed: Slots,
    baseline: Slots,
}

impl ResultAggregator {
    /// Offer an attempt graded at `tier`.
    pub fn update(&mut self, attempt: RouteAttempt, tier: ComplianceTier) -> LeaderUpdate {
        let graded = attempt.at_tier(tier);
        self.slots_mut(tier).offer(&graded)
    }

    /// True when no attempt has been accepted at `tier`.
    #[must_use]
    pub fn is_empty(&self, tier: ComplianceTier) -> bool {
        self.slots(tier).is_empty()
    }

    /// Leaders of the best non-empty tier, strict first. Leaders are marked
    /// compliant only at [`ComplianceTier::Strict`].
    #[must_use]
    pub fn finalize(&self) -> Option<LeaderSnapshot> {
        [
            ComplianceTier::Strict,
            ComplianceTier::Relaxed,
            ComplianceTier::Baseline,
        ]
        .into_iter()
        .find_map(|tier| {
            let slots = self.slots(tier);
            let compliant = tier == ComplianceTier::Strict;
            let leader = |slot: &Option<RouteAttempt>| {
                slot.clone().map(|attempt| Leader { attempt, compliant })
            };
            Some(LeaderSnapshot {
                tier,
                fastest: leader(&slots.fastest)?,
                cheapest: leader(&slots.cheapest)?,
                min_tolls: leader(&slots.min_tolls)?,
            })
        })
    }

    const fn slots(&self, tier: ComplianceTier) -> &Slots {
        match tier {
            ComplianceTier::Strict => &self.strict,
            ComplianceTier::Relaxed => &self.relaxed,
            ComplianceTier::Baseline => &self.baseline,
        }
    }

    const fn slots_mut(&mut self, tier: ComplianceTier) -> &mut Slots {
        match tier {
            ComplianceTier::Strict => &mut self.strict,
            ComplianceTier::Relaxed => &mut self.relaxed,
            ComplianceTier::Baseline => &mut self.baseline,
        }
    }
}
