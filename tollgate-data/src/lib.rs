//! Collaborator adapters for the Tollgate engine.
//!
//! Responsibilities:
//! - [`routing::OrsRouteProvider`]: routes from an OpenRouteService instance.
//! - [`JsonTollCatalog`]: toll stations and junctions from a linked JSON
//!   export.
//! - [`TariffTable`]: open and closed tariffs from a JSON tariff file.
//!
//! Boundaries:
//! - Do not encode search rules (those live in `tollgate-solver`).
//! - Loaded data is immutable, so adapters can be shared across sessions.
#![forbid(unsafe_code)]

mod catalog;
mod error;
pub mod routing;
mod tariffs;

pub use catalog::JsonTollCatalog;
pub use error::LoadError;
pub use tariffs::TariffTable;
