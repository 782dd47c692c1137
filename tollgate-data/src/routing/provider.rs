//! HTTP `RouteProvider` backed by an OpenRouteService directions endpoint.
//!
//! The [`RouteProvider`] trait is synchronous so the optimiser can drive it
//! from plain threads. This provider bridges to async `reqwest` by blocking on
//! a Tokio runtime it owns.

use std::time::Duration;

use geo::Coord;
use log::debug;
use reqwest::Client;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use tollgate_core::{AvoidDirective, RouteError, RoutePlan, RouteProvider};

use super::ors::{DirectionsRequest, DirectionsResponse, classify_failure};

/// Errors raised while building an [`OrsRouteProvider`].
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// The Tokio runtime could not be built.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Default user agent for ORS requests.
pub const DEFAULT_USER_AGENT: &str = "tollgate-routing/0.1";

/// Default ORS base URL, matching a local ORS container.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8082/ors";

/// Default ORS routing profile.
pub const DEFAULT_PROFILE: &str = "driving-car";

const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Configuration for [`OrsRouteProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrsRouteProviderConfig {
    /// Base URL of the ORS service, up to but excluding `/v2`.
    pub base_url: String,
    /// Routing profile, e.g. `driving-car` or `driving-hgv`.
    pub profile: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// API key sent as the `Authorization` header, for hosted ORS.
    pub api_key: Option<String>,
}

impl Default for OrsRouteProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            profile: DEFAULT_PROFILE.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            api_key: None,
        }
    }
}

impl OrsRouteProviderConfig {
    /// Configuration for the given base URL with default settings.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the routing profile.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Directions endpoint for the configured profile.
    #[must_use]
    pub fn directions_url(&self) -> String {
        format!(
            "{}/v2/directions/{}/geojson",
            self.base_url.trim_end_matches('/'),
            self.profile
        )
    }
}

/// Route provider calling the ORS directions API.
///
/// # Runtime behaviour
///
/// Outside any Tokio runtime, requests run on the provider's own
/// current-thread runtime. Inside a multi-threaded runtime the caller's handle
/// is used through [`tokio::task::block_in_place`]. Inside a current-thread
/// runtime the provider falls back to its own runtime, which blocks the
/// caller's executor for the duration of the request.
///
/// The optimiser may call [`RouteProvider::get_route`] from several rayon
/// workers at once. A current-thread runtime only drives one `block_on` at a
/// time, so concurrent calls are serialised on the runtime's driver.
pub struct OrsRouteProvider {
    client: Client,
    config: OrsRouteProviderConfig,
    url: String,
    runtime: Runtime,
}

impl std::fmt::Debug for OrsRouteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrsRouteProvider")
            .field("url", &self.url)
            .field("timeout", &self.config.timeout)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish_non_exhaustive()
    }
}

impl OrsRouteProvider {
    /// Provider for `base_url` with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderBuildError> {
        Self::with_config(OrsRouteProviderConfig::new(base_url))
    }

    /// Provider with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn with_config(config: OrsRouteProviderConfig) -> Result<Self, ProviderBuildError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(ProviderBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ProviderBuildError::Runtime)?;
        let url = config.directions_url();
        Ok(Self {
            client,
            config,
            url,
            runtime,
        })
    }

    /// The provider configuration.
    #[must_use]
    pub const fn config(&self) -> &OrsRouteProviderConfig {
        &self.config
    }

    async fn fetch_route(
        &self,
        coordinates: &[Coord<f64>],
        avoid: &AvoidDirective,
    ) -> Result<RoutePlan, RouteError> {
        let body = DirectionsRequest::new(coordinates, avoid);
        let request = self.client.post(&self.url).json(&body);
        let authorised = match &self.config.api_key {
            Some(key) => request.header(reqwest::header::AUTHORIZATION, key),
            None => request,
        };
        let response = authorised
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| self.convert_reqwest_error(&err))?;
        if !status.is_success() {
            debug!("ORS answered {status} for {}", self.url);
            return Err(classify_failure(status.as_u16(), &text, &self.url));
        }
        let parsed: DirectionsResponse =
            serde_json::from_str(&text).map_err(|err| RouteError::ParseError {
                message: err.to_string(),
            })?;
        parsed.into_plan()
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error) -> RouteError {
        if error.is_timeout() {
            return RouteError::Timeout {
                url: self.url.clone(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return RouteError::HttpError {
                url: self.url.clone(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        RouteError::NetworkError {
            url: self.url.clone(),
            message: error.to_string(),
        }
    }
}

impl RouteProvider for OrsRouteProvider {
    fn get_route(
        &self,
        coordinates: &[Coord<f64>],
        avoid: &AvoidDirective,
    ) -> Result<RoutePlan, RouteError> {
        if coordinates.len() < 2 {
            return Err(RouteError::TooFewCoordinates);
        }

        let future = self.fetch_route(coordinates, avoid);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_target_a_local_container() {
        let config = OrsRouteProviderConfig::default();
        assert_eq!(
            config.directions_url(),
            "http://localhost:8082/ors/v2/directions/driving-car/geojson"
        );
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert!(config.api_key.is_none());
    }

    #[rstest]
    fn directions_url_strips_trailing_slash() {
        let config = OrsRouteProviderConfig::new("https://api.openrouteservice.org/")
            .with_profile("driving-hgv");
        assert_eq!(
            config.directions_url(),
            "https://api.openrouteservice.org/v2/directions/driving-hgv/geojson"
        );
    }

    #[rstest]
    fn config_builder_pattern() {
        let config = OrsRouteProviderConfig::new("http://example.com")
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("test-agent/1.0")
            .with_api_key("secret");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "test-agent/1.0");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
    }

    #[rstest]
    fn single_coordinate_is_rejected_without_a_request() {
        let provider = OrsRouteProvider::new("http://127.0.0.1:9").expect("provider should build");
        let err = provider
            .get_route(&[Coord { x: 7.4, y: 48.2 }], &AvoidDirective::None)
            .expect_err("single coordinate");
        assert_eq!(err, RouteError::TooFewCoordinates);
    }
}
