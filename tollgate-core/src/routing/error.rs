use thiserror::Error;

/// Errors from [`crate::routing::RouteProvider::get_route`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// Fewer than two coordinates were supplied.
    #[error("at least two coordinates are required to request a route")]
    TooFewCoordinates,

    /// The routing engine found no route satisfying the request.
    ///
    /// For an unrestricted request this means the endpoints are not
    /// connected; with an avoidance directive it means the avoidance cannot
    /// be honoured.
    #[error("no route found: {message}")]
    NoRoute {
        /// Description reported by the routing engine.
        message: String,
    },

    /// The request exceeded its timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },

    /// The service answered with a non-success HTTP status.
    #[error("HTTP {status} from {url}: {message}")]
    HttpError {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response detail.
        message: String,
    },

    /// The service could not be reached.
    #[error("network error contacting {url}: {message}")]
    NetworkError {
        /// Requested URL.
        url: String,
        /// Transport detail.
        message: String,
    },

    /// The response body could not be understood.
    #[error("failed to parse routing response: {message}")]
    ParseError {
        /// Parser detail.
        message: String,
    },

    /// The service reported an application-level error.
    #[error("routing service error {code}: {message}")]
    ServiceError {
        /// Service error code.
        code: String,
        /// Service error message.
        message: String,
    },
}

impl RouteError {
    /// True when the engine positively reported that no route exists, as
    /// opposed to being unavailable.
    #[must_use]
    pub const fn is_no_route(&self) -> bool {
        matches!(self, Self::NoRoute { .. })
    }
}
