//! Table-driven toll pricing loaded from a JSON tariff file.
//!
//! Each row prices one entry/exit pair in euros per vehicle class. Open tolls
//! are stored with the same id as entry and exit:
//!
//! ```json
//! {
//!   "tariffs": [
//!     {"entry": "T3", "exit": "T3", "c1": 2.10, "c2": 3.20},
//!     {"entry": "T1", "exit": "T2", "c1": 8.40, "c2": 12.60, "c3": 21.30}
//!   ]
//! }
//! ```
//!
//! A closed run is priced pair by pair in crossing order. A trailing station
//! without an exit is charged its own `(id, id)` row when one exists and is
//! free otherwise.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use serde::Deserialize;
use tollgate_core::{Cost, PricingError, PricingService, TollId, VehicleClass};

use crate::LoadError;

#[derive(Debug, Deserialize)]
struct TariffDocument {
    tariffs: Vec<TariffRecord>,
}

#[derive(Debug, Deserialize)]
struct TariffRecord {
    entry: String,
    exit: String,
    #[serde(default)]
    c1: Option<f64>,
    #[serde(default)]
    c2: Option<f64>,
    #[serde(default)]
    c3: Option<f64>,
    #[serde(default)]
    c4: Option<f64>,
    #[serde(default)]
    c5: Option<f64>,
}

impl TariffRecord {
    fn prices(&self) -> [(VehicleClass, Option<f64>); 5] {
        [
            (VehicleClass::C1, self.c1),
            (VehicleClass::C2, self.c2),
            (VehicleClass::C3, self.c3),
            (VehicleClass::C4, self.c4),
            (VehicleClass::C5, self.c5),
        ]
    }
}

type TariffKey = (TollId, TollId, VehicleClass);

/// [`PricingService`] answering from an in-memory tariff table.
#[derive(Debug, Default, Clone)]
pub struct TariffTable {
    prices: HashMap<TariffKey, Cost>,
}

impl TariffTable {
    /// Load a tariff file.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the file cannot be read or parsed, or when
    /// it repeats a pair or carries a negative price.
    pub fn load(path: &Utf8Path) -> Result<Self, LoadError> {
        let text = tollgate_fs::read_utf8(path).map_err(|source| LoadError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Build a table from JSON text.
    ///
    /// # Errors
    ///
    /// As for [`TariffTable::load`], minus I/O failures.
    pub fn from_json_str(text: &str) -> Result<Self, LoadError> {
        Self::parse(text, &Utf8PathBuf::from("<inline>"))
    }

    fn parse(text: &str, path: &Utf8Path) -> Result<Self, LoadError> {
        let document: TariffDocument =
            serde_json::from_str(text).map_err(|source| LoadError::Parse {
                path: path.to_owned(),
                source,
            })?;
        let mut table = Self::default();
        for record in &document.tariffs {
            for (class, price) in record.prices() {
                let Some(euros) = price else { continue };
                let cost = Cost::from_euros(euros).ok_or_else(|| LoadError::Invalid {
                    origin: path.to_string(),
                    message: format!(
                        "invalid {class} price {euros} for {} -> {}",
                        record.entry, record.exit
                    ),
                })?;
                if !table.insert(&record.entry, &record.exit, class, cost) {
                    return Err(LoadError::Invalid {
                        origin: path.to_string(),
                        message: format!("duplicate tariff {} -> {}", record.entry, record.exit),
                    });
                }
            }
        }
        debug!("loaded {} tariff cells from {path}", table.len());
        Ok(table)
    }

    /// Record the price of `entry -> exit` for `class`; false when the cell
    /// was already set.
    fn insert(&mut self, entry: &str, exit: &str, class: VehicleClass, cost: Cost) -> bool {
        let key = (TollId::from(entry), TollId::from(exit), class);
        if self.prices.contains_key(&key) {
            return false;
        }
        self.prices.insert(key, cost);
        true
    }

    /// Number of priced (pair, class) cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// True when no prices are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Price of `entry -> exit`, trying the reverse direction when only that
    /// one is listed.
    fn pair(&self, entry: &TollId, exit: &TollId, class: VehicleClass) -> Option<Cost> {
        self.prices
            .get(&(entry.clone(), exit.clone(), class))
            .or_else(|| self.prices.get(&(exit.clone(), entry.clone(), class)))
            .copied()
    }
}

impl PricingService for TariffTable {
    fn open_toll_cost(&self, id: &TollId, class: VehicleClass) -> Result<Cost, PricingError> {
        self.pair(id, id, class)
            .ok_or_else(|| PricingError::MissingTariff {
                ids: vec![id.clone()],
                class,
            })
    }

    fn closed_sequence_cost(
        &self,
        ids: &[TollId],
        class: VehicleClass,
    ) -> Result<Cost, PricingError> {
        let total = ids.chunks(2).fold(Cost::ZERO, |sum, chunk| {
            let cost = match chunk {
                [entry, exit] => self.pair(entry, exit, class).unwrap_or_else(|| {
                    warn!("no {class} tariff for {entry} -> {exit}; pricing as zero");
                    Cost::ZERO
                }),
                [single] => self.pair(single, single, class).unwrap_or(Cost::ZERO),
                _ => Cost::ZERO,
            };
            sum.saturating_add(cost)
        });
        Ok(total)
    }
}
