//! OpenRouteService directions payloads.
//!
//! Requests target `POST /v2/directions/{profile}/geojson`; responses are a
//! GeoJSON `FeatureCollection` whose first feature carries the route line and
//! its summary.
//!
//! See: <https://openrouteservice.org/dev/#/api-docs/v2/directions>

use std::time::Duration;

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use tollgate_core::{AvoidDirective, RouteError, RoutePlan};

/// ORS error code for "route could not be found".
const ROUTE_NOT_FOUND: u32 = 2009;
/// ORS error code for "point not found" (no routable road near a waypoint).
const POINT_NOT_FOUND: u32 = 2010;

/// Body of a directions request.
#[derive(Debug, Serialize)]
pub(crate) struct DirectionsRequest {
    coordinates: Vec<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<RequestOptions>,
    extra_info: [&'static str; 1],
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    avoid_features: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    avoid_polygons: Option<GeoJsonMultiPolygon>,
}

#[derive(Debug, Serialize)]
struct GeoJsonMultiPolygon {
    #[serde(rename = "type")]
    kind: &'static str,
    coordinates: Vec<Vec<Vec<[f64; 2]>>>,
}

impl From<&MultiPolygon<f64>> for GeoJsonMultiPolygon {
    fn from(zones: &MultiPolygon<f64>) -> Self {
        Self {
            kind: "MultiPolygon",
            coordinates: zones.iter().map(polygon_rings).collect(),
        }
    }
}

fn polygon_rings(polygon: &Polygon<f64>) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.coords().map(|c| [c.x, c.y]).collect())
        .collect()
}

impl DirectionsRequest {
    /// Build the request for `coordinates` honouring `avoid`.
    pub(crate) fn new(coordinates: &[Coord<f64>], avoid: &AvoidDirective) -> Self {
        let options = match avoid {
            AvoidDirective::None => None,
            AvoidDirective::AllTollways => Some(RequestOptions {
                avoid_features: vec!["tollways"],
                avoid_polygons: None,
            }),
            AvoidDirective::Zones(zones) => Some(RequestOptions {
                avoid_features: Vec::new(),
                avoid_polygons: Some(zones.into()),
            }),
        };
        Self {
            coordinates: coordinates.iter().map(|c| [c.x, c.y]).collect(),
            options,
            extra_info: ["tollways"],
        }
    }
}

/// Successful directions response.
#[derive(Debug, Deserialize)]
pub(crate) struct DirectionsResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: FeatureGeometry,
    properties: FeatureProperties,
}

#[derive(Debug, Deserialize)]
struct FeatureGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct FeatureProperties {
    #[serde(default)]
    summary: Summary,
}

/// ORS omits zero-valued summary fields.
#[derive(Debug, Default, Deserialize)]
struct Summary {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Coded { code: u32, message: String },
    Plain(String),
}

impl DirectionsResponse {
    /// Convert the first feature into a [`RoutePlan`].
    pub(crate) fn into_plan(self) -> Result<RoutePlan, RouteError> {
        let feature = self
            .features
            .into_iter()
            .next()
            .ok_or_else(|| parse_error("response contains no route feature"))?;
        if feature.geometry.coordinates.len() < 2 {
            return Err(parse_error("route geometry has fewer than two points"));
        }
        let summary = feature.properties.summary;
        if !summary.distance.is_finite() || summary.distance < 0.0 {
            return Err(parse_error(format!(
                "invalid route distance {}",
                summary.distance
            )));
        }
        let duration = Duration::try_from_secs_f64(summary.duration).map_err(|err| {
            parse_error(format!("invalid route duration {}: {err}", summary.duration))
        })?;
        let geometry: LineString<f64> = feature
            .geometry
            .coordinates
            .into_iter()
            .map(|[x, y]| Coord { x, y })
            .collect();
        Ok(RoutePlan::new(geometry, summary.distance, duration))
    }
}

/// Classify a non-success response.
///
/// HTTP 404 and the ORS "no route" codes mean the request cannot be honoured;
/// other coded errors are service errors and anything else is reported with
/// its raw HTTP status.
pub(crate) fn classify_failure(status: u16, body: &str, url: &str) -> RouteError {
    let parsed = serde_json::from_str::<ErrorResponse>(body).ok();
    match parsed.map(|response| response.error) {
        Some(ErrorDetail::Coded { code, message })
            if status == 404 || matches!(code, ROUTE_NOT_FOUND | POINT_NOT_FOUND) =>
        {
            RouteError::NoRoute { message }
        }
        Some(ErrorDetail::Coded { code, message }) => RouteError::ServiceError {
            code: code.to_string(),
            message,
        },
        Some(ErrorDetail::Plain(message)) if status == 404 => RouteError::NoRoute { message },
        Some(ErrorDetail::Plain(message)) => RouteError::HttpError {
            url: url.to_owned(),
            status,
            message,
        },
        None if status == 404 => RouteError::NoRoute {
            message: body.to_owned(),
        },
        None => RouteError::HttpError {
            url: url.to_owned(),
            status,
            message: body.to_owned(),
        },
    }
}

fn parse_error(message: impl Into<String>) -> RouteError {
    RouteError::ParseError {
        message: message.into(),
    }
}
