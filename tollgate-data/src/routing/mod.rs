//! OpenRouteService routing adapter.
//!
//! [`OrsRouteProvider`] implements [`tollgate_core::RouteProvider`] over the
//! ORS directions API, mapping avoidance directives onto
//! `options.avoid_features` and `options.avoid_polygons`.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use geo::Coord;
//! use tollgate_core::{AvoidDirective, RouteProvider};
//! use tollgate_data::routing::{OrsRouteProvider, OrsRouteProviderConfig};
//!
//! let config = OrsRouteProviderConfig::new("http://localhost:8082/ors")
//!     .with_timeout(Duration::from_secs(30));
//! let provider = OrsRouteProvider::with_config(config)?;
//!
//! let plan = provider.get_route(
//!     &[Coord { x: 7.448_595, y: 48.262_004 }, Coord { x: 7.750_0, y: 48.580_0 }],
//!     &AvoidDirective::AllTollways,
//! )?;
//! println!("{} m in {:?}", plan.distance_m, plan.duration);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod ors;
mod provider;

pub use provider::{
    DEFAULT_BASE_URL, DEFAULT_PROFILE, DEFAULT_USER_AGENT, OrsRouteProvider,
    OrsRouteProviderConfig, ProviderBuildError,
};
