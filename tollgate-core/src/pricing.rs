//! Tariff lookups for open and closed toll systems.

use std::sync::Arc;

use thiserror::Error;

use crate::{Cost, TollId, VehicleClass};

/// Errors from a [`PricingService`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// No tariff exists for the toll or sequence.
    #[error("no tariff for {ids:?} ({class})")]
    MissingTariff {
        /// Tolls that could not be priced.
        ids: Vec<TollId>,
        /// Requested vehicle class.
        class: VehicleClass,
    },
    /// The pricing backend failed.
    #[error("pricing backend unavailable: {0}")]
    Unavailable(String),
}

/// Price tolls for a vehicle class.
pub trait PricingService: Send + Sync {
    /// Fixed tariff of an open-system toll.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError`] when the toll cannot be priced.
    fn open_toll_cost(&self, id: &TollId, class: VehicleClass) -> Result<Cost, PricingError>;

    /// Tariff of a run of closed-system tolls crossed in order.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError`] when the run cannot be priced.
    fn closed_sequence_cost(
        &self,
        ids: &[TollId],
        class: VehicleClass,
    ) -> Result<Cost, PricingError>;
}

impl<T: PricingService + ?Sized> PricingService for &T {
    fn open_toll_cost(&self, id: &TollId, class: VehicleClass) -> Result<Cost, PricingError> {
        (**self).open_toll_cost(id, class)
    }

    fn closed_sequence_cost(
        &self,
        ids: &[TollId],
        class: VehicleClass,
    ) -> Result<Cost, PricingError> {
        (**self).closed_sequence_cost(ids, class)
    }
}

impl<T: PricingService + ?Sized> PricingService for Arc<T> {
    fn open_toll_cost(&self, id: &TollId, class: VehicleClass) -> Result<Cost, PricingError> {
        (**self).open_toll_cost(id, class)
    }

    fn closed_sequence_cost(
        &self,
        ids: &[TollId],
        class: VehicleClass,
    ) -> Result<Cost, PricingError> {
        (**self).closed_sequence_cost(ids, class)
    }
}
