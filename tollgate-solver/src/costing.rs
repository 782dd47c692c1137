//! Locate and price the tolls on a route.
//!
//! Tolls are priced in runs: every OPEN toll is a run of its own and
//! consecutive CLOSED tolls form one run priced as an ordered sequence.
//! Runs go through the [`SequenceCostCache`] first and fall back to the
//! [`PricingService`] on a miss. Each toll's individual cost is its marginal
//! contribution to its run.

use geo::Coord;
use log::warn;
use tollgate_core::{
    Cost, JunctionRef, PricingError, PricingService, RouteAttempt, RoutePlan, SequenceCostCache,
    TollCandidate, TollCatalog, TollId, VehicleClass,
};

/// Prices routes for one vehicle class.
pub(crate) struct RouteCoster<'a> {
    catalog: &'a dyn TollCatalog,
    pricing: &'a dyn PricingService,
    cache: &'a SequenceCostCache,
    class: VehicleClass,
    buffer_m: f64,
}

impl<'a> RouteCoster<'a> {
    pub(crate) fn new(
        catalog: &'a dyn TollCatalog,
        pricing: &'a dyn PricingService,
        cache: &'a SequenceCostCache,
        class: VehicleClass,
        buffer_m: f64,
    ) -> Self {
        Self {
            catalog,
            pricing,
            cache,
            class,
            buffer_m,
        }
    }

    /// Tolls on `geometry` in route order, consecutive repeats collapsed.
    pub(crate) fn locate(&self, geometry: &geo::LineString<f64>) -> Vec<TollCandidate> {
        let mut tolls = self.catalog.find_tolls_on_route(geometry, self.buffer_m);
        tolls.dedup_by(|next, previous| next.id == previous.id);
        for (index, toll) in tolls.iter_mut().enumerate() {
            toll.route_index = index;
        }
        tolls
    }

    /// Junction preceding `toll`, from the catalog.
    pub(crate) fn junction_before(&self, toll: &TollId) -> Option<JunctionRef> {
        self.catalog.junction_before(toll)
    }

    /// Build a priced attempt from a routed plan.
    pub(crate) fn assess(
        &self,
        waypoints: &[Coord<f64>],
        plan: RoutePlan,
    ) -> Result<RouteAttempt, PricingError> {
        let (priced, total) = self.price(self.locate(&plan.geometry))?;
        Ok(RouteAttempt::from_plan(waypoints.to_vec(), plan, priced, total))
    }

    /// Like [`assess`](Self::assess), but a pricing failure leaves the tolls
    /// unpriced instead of failing. Used for the base route, which must
    /// always exist.
    pub(crate) fn assess_lenient(
        &self,
        waypoints: &[Coord<f64>],
        plan: RoutePlan,
    ) -> RouteAttempt {
        let tolls = self.locate(&plan.geometry);
        match self.price(tolls.clone()) {
            Ok((priced, total)) => {
                RouteAttempt::from_plan(waypoints.to_vec(), plan, priced, total)
            }
            Err(err) => {
                warn!("pricing the base route failed, treating its tolls as free: {err}");
                RouteAttempt::from_plan(waypoints.to_vec(), plan, tolls, Cost::ZERO)
            }
        }
    }

    /// Price tolls in route order, filling in each toll's individual cost.
    pub(crate) fn price(
        &self,
        mut tolls: Vec<TollCandidate>,
    ) -> Result<(Vec<TollCandidate>, Cost), PricingError> {
        let mut total = Cost::ZERO;
        let mut start = 0;
        while start < tolls.len() {
            let run_len = run_length(tolls.get(start..).unwrap_or_default());
            let end = start.saturating_add(run_len.max(1));
            let Some(run) = tolls.get_mut(start..end) else {
                break;
            };
            total = total.saturating_add(self.price_run(run)?);
            start = end;
        }
        Ok((tolls, total))
    }

    /// Price one run and store each member's marginal share.
    fn price_run(&self, run: &mut [TollCandidate]) -> Result<Cost, PricingError> {
        let run_cost = self.sequence_cost(run)?;
        if let [single] = run {
            single.cost = run_cost;
            return Ok(run_cost);
        }
        let shares = (0..run.len())
            .map(|skip| {
                let without: Vec<TollCandidate> = run
                    .iter()
                    .enumerate()
                    .filter(|(index, _)| *index != skip)
                    .map(|(_, toll)| toll.clone())
                    .collect();
                self.sequence_cost(&without)
                    .map(|remaining| run_cost.saturating_sub(remaining))
            })
            .collect::<Result<Vec<_>, _>>()?;
        for (toll, share) in run.iter_mut().zip(shares) {
            toll.cost = share;
        }
        Ok(run_cost)
    }

    fn sequence_cost(&self, run: &[TollCandidate]) -> Result<Cost, PricingError> {
        if run.is_empty() {
            return Ok(Cost::ZERO);
        }
        if let Some(cost) = self.cache.get(run, self.class) {
            return Ok(cost);
        }
        let cost = match run {
            [single] if !single.is_closed() => {
                self.pricing.open_toll_cost(&single.id, self.class)?
            }
            _ => {
                let ids: Vec<_> = run.iter().map(|toll| toll.id.clone()).collect();
                self.pricing.closed_sequence_cost(&ids, self.class)?
            }
        };
        self.cache.put(run, self.class, cost);
        Ok(cost)
    }
}

/// Length of the run starting at the head of `tolls`: one for an OPEN
/// toll, otherwise the number of consecutive CLOSED tolls.
fn run_length(tolls: &[TollCandidate]) -> usize {
    match tolls.first() {
        Some(first) if first.is_closed() => {
            tolls.iter().take_while(|toll| toll.is_closed()).count()
        }
        Some(_) => 1,
        None => 0,
    }
}
