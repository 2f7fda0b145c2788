//! OSRM-compatible HTTP directions gateway.
//!
//! Talks to the OSRM `route` service (self-hosted or a compatible hosted
//! endpoint):
//!
//! ```text
//! GET {base_url}/route/v1/{profile}/{lon},{lat};{lon},{lat}?steps=true&geometries=geojson&overview=false
//! ```
//!
//! The first returned route is mapped to [`Route`]; each OSRM step becomes a
//! [`RouteStep`] whose instruction is synthesised from the maneuver type,
//! modifier and street name.

use std::time::Duration;

use serde::Deserialize;

use super::gateway::{BoxFuture, DirectionsGateway};
use super::types::{GatewayError, Route, RouteStep};
use crate::geo::Coordinate;

/// Default OSRM endpoint (public demo server).
pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";

/// Default routing profile.
pub const DEFAULT_PROFILE: &str = "driving";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for [`OsrmGateway`].
#[derive(Debug, Clone, PartialEq)]
pub struct OsrmConfig {
    /// Service root, without trailing slash.
    pub base_url: String,
    /// Routing profile (`driving`, `car`, ...).
    pub profile: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OSRM_URL.to_string(),
            profile: DEFAULT_PROFILE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl OsrmConfig {
    /// Set the service root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the routing profile.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Directions gateway backed by an OSRM `route` service.
pub struct OsrmGateway {
    client: reqwest::Client,
    config: OsrmConfig,
}

impl std::fmt::Debug for OsrmGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OsrmGateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OsrmGateway {
    /// Create a gateway with its own HTTP client.
    pub fn new(config: OsrmConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                GatewayError::ProviderUnavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    /// Build the request URL for a route query.
    pub fn build_url(&self, origin: &Coordinate, destination: &Coordinate) -> String {
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?steps=true&geometries=geojson&overview=false",
            self.config.base_url,
            self.config.profile,
            origin.longitude,
            origin.latitude,
            destination.longitude,
            destination.latitude
        )
    }

    async fn fetch(&self, origin: Coordinate, destination: Coordinate) -> Result<Route, GatewayError> {
        let url = self.build_url(&origin, &destination);
        tracing::debug!(url = %url, "Requesting route");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::ProviderUnavailable(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(GatewayError::ProviderUnavailable(format!(
                "HTTP {} from {}",
                status, self.config.base_url
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::ProviderUnavailable(format!("Failed to read response: {}", e)))?;

        match serde_json::from_slice::<OsrmResponse>(&body) {
            Ok(parsed) => parse_response(parsed),
            Err(_) if status.is_client_error() => Err(GatewayError::InvalidInput(format!(
                "HTTP {} from {}",
                status, self.config.base_url
            ))),
            Err(e) => Err(GatewayError::ProviderUnavailable(format!(
                "Malformed response: {}",
                e
            ))),
        }
    }
}

impl DirectionsGateway for OsrmGateway {
    fn compute_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> BoxFuture<'_, Result<Route, GatewayError>> {
        Box::pin(self.fetch(origin, destination))
    }

    fn name(&self) -> &str {
        "OSRM"
    }
}

// =============================================================================
// Response model
// =============================================================================

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    distance: f64,
    duration: f64,
    #[serde(default)]
    name: String,
    geometry: OsrmGeometry,
    maneuver: OsrmManeuver,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// `[lon, lat]` pairs.
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct OsrmManeuver {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    modifier: Option<String>,
    /// `[lon, lat]`.
    location: [f64; 2],
}

fn parse_response(response: OsrmResponse) -> Result<Route, GatewayError> {
    let message = response.message.unwrap_or_default();
    match response.code.as_str() {
        "Ok" => {}
        "NoRoute" | "NoSegment" => return Err(GatewayError::NoRouteFound),
        "InvalidUrl" | "InvalidService" | "InvalidVersion" | "InvalidOptions" | "InvalidQuery"
        | "InvalidValue" | "TooBig" => {
            return Err(GatewayError::InvalidInput(format!("{}: {}", response.code, message)))
        }
        other => {
            return Err(GatewayError::ProviderUnavailable(format!("{}: {}", other, message)))
        }
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or(GatewayError::NoRouteFound)?;

    let mut steps = Vec::new();
    for step in route.legs.into_iter().flat_map(|leg| leg.steps) {
        steps.push(convert_step(step)?);
    }

    Route::new(steps, route.distance, route.duration)
}

fn convert_step(step: OsrmStep) -> Result<RouteStep, GatewayError> {
    let to_coordinate = |[lon, lat]: [f64; 2]| {
        Coordinate::new(lat, lon)
            .map_err(|e| GatewayError::ProviderUnavailable(format!("Malformed geometry: {}", e)))
    };

    let mut points = Vec::with_capacity(step.geometry.coordinates.len().max(1));
    for pair in step.geometry.coordinates {
        points.push(to_coordinate(pair)?);
    }
    // Arrive steps may carry a single repeated point; fall back to the maneuver location.
    if points.is_empty() {
        points.push(to_coordinate(step.maneuver.location)?);
    }

    let instruction = instruction_text(
        &step.maneuver.kind,
        step.maneuver.modifier.as_deref(),
        &step.name,
    );

    Ok(RouteStep::new(instruction, points, step.distance, step.duration))
}

/// Compose a spoken/displayed instruction from OSRM maneuver fields.
fn instruction_text(kind: &str, modifier: Option<&str>, name: &str) -> String {
    let direction = modifier.unwrap_or("straight");
    let base = match kind {
        "depart" => "Depart".to_string(),
        "arrive" => return "Arrive at destination".to_string(),
        "turn" | "end of road" if direction == "uturn" => "Make a U-turn".to_string(),
        "turn" => format!("Turn {}", direction),
        "end of road" => format!("Turn {} at the end of the road", direction),
        "continue" | "new name" => format!("Continue {}", direction),
        "merge" => format!("Merge {}", direction),
        "on ramp" => format!("Take the ramp on the {}", direction),
        "off ramp" => format!("Take the exit on the {}", direction),
        "fork" => format!("Keep {} at the fork", direction),
        "roundabout" | "rotary" | "roundabout turn" => "Enter the roundabout".to_string(),
        "exit roundabout" | "exit rotary" => "Exit the roundabout".to_string(),
        _ => format!("Continue {}", direction),
    };

    if name.is_empty() {
        base
    } else if kind == "depart" {
        format!("{} on {}", base, name)
    } else {
        format!("{} onto {}", base, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OK_BODY: &str = r#"{
        "code": "Ok",
        "routes": [{
            "distance": 1234.5,
            "duration": 180.0,
            "legs": [{
                "steps": [
                    {
                        "distance": 400.0, "duration": 60.0, "name": "Janpath",
                        "geometry": {"coordinates": [[77.2090, 28.6139], [77.2100, 28.6160]]},
                        "maneuver": {"type": "depart", "location": [77.2090, 28.6139]}
                    },
                    {
                        "distance": 834.5, "duration": 120.0, "name": "Rajpath",
                        "geometry": {"coordinates": [[77.2100, 28.6160], [77.2200, 28.6170]]},
                        "maneuver": {"type": "turn", "modifier": "right", "location": [77.2100, 28.6160]}
                    },
                    {
                        "distance": 0.0, "duration": 0.0, "name": "",
                        "geometry": {"coordinates": []},
                        "maneuver": {"type": "arrive", "location": [77.2200, 28.6170]}
                    }
                ]
            }]
        }]
    }"#;

    fn parse(body: &str) -> Result<Route, GatewayError> {
        parse_response(serde_json::from_str(body).unwrap())
    }

    #[test]
    fn test_parse_ok_response() {
        let route = parse(OK_BODY).unwrap();
        assert_eq!(route.step_count(), 3);
        assert_eq!(route.distance_m(), 1234.5);
        assert_eq!(route.duration_s(), 180.0);

        let first = route.step(0).unwrap();
        assert_eq!(first.instruction, "Depart on Janpath");
        let start = first.start_point().unwrap();
        assert!((start.latitude - 28.6139).abs() < 1e-9);
        assert!((start.longitude - 77.2090).abs() < 1e-9);

        assert_eq!(route.step(1).unwrap().instruction, "Turn right onto Rajpath");
    }

    #[test]
    fn test_arrive_step_uses_maneuver_location() {
        let route = parse(OK_BODY).unwrap();
        let arrive = route.step(2).unwrap();
        assert_eq!(arrive.instruction, "Arrive at destination");
        assert_eq!(arrive.points.len(), 1);
    }

    #[test]
    fn test_no_route_code() {
        let body = r#"{"code": "NoRoute", "message": "Impossible route between points"}"#;
        assert_eq!(parse(body), Err(GatewayError::NoRouteFound));
    }

    #[test]
    fn test_ok_without_routes() {
        assert_eq!(parse(r#"{"code": "Ok", "routes": []}"#), Err(GatewayError::NoRouteFound));
    }

    #[test]
    fn test_invalid_query_code() {
        let body = r#"{"code": "InvalidQuery", "message": "Query string malformed"}"#;
        assert!(matches!(parse(body), Err(GatewayError::InvalidInput(_))));
    }

    #[test]
    fn test_unknown_code_is_unavailable() {
        let body = r#"{"code": "Overloaded"}"#;
        assert!(matches!(parse(body), Err(GatewayError::ProviderUnavailable(_))));
    }

    #[test]
    fn test_malformed_geometry_rejected() {
        let body = r#"{
            "code": "Ok",
            "routes": [{"distance": 1.0, "duration": 1.0, "legs": [{"steps": [{
                "distance": 1.0, "duration": 1.0, "name": "",
                "geometry": {"coordinates": [[200.0, 95.0]]},
                "maneuver": {"type": "depart", "location": [0.0, 0.0]}
            }]}]}]
        }"#;
        assert!(matches!(parse(body), Err(GatewayError::ProviderUnavailable(_))));
    }

    #[test]
    fn test_instruction_text_variants() {
        assert_eq!(instruction_text("turn", Some("left"), ""), "Turn left");
        assert_eq!(instruction_text("turn", Some("uturn"), "MG Road"), "Make a U-turn onto MG Road");
        assert_eq!(
            instruction_text("fork", Some("slight right"), ""),
            "Keep slight right at the fork"
        );
        assert_eq!(instruction_text("roundabout", None, ""), "Enter the roundabout");
        assert_eq!(instruction_text("new name", None, "Ring Road"), "Continue straight onto Ring Road");
    }

    #[test]
    fn test_build_url_orders_lon_lat() {
        let gateway = OsrmGateway::new(OsrmConfig::default().with_base_url("http://localhost:5000/"))
            .unwrap();
        let a = Coordinate::new(28.6139, 77.209).unwrap();
        let b = Coordinate::new(28.7, 77.1).unwrap();
        assert_eq!(
            gateway.build_url(&a, &b),
            "http://localhost:5000/route/v1/driving/77.209000,28.613900;77.100000,28.700000?steps=true&geometries=geojson&overview=false"
        );
    }

    #[test]
    fn test_config_builder() {
        let config = OsrmConfig::default()
            .with_profile("car")
            .with_timeout(Duration::from_secs(3));
        assert_eq!(config.profile, "car");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.base_url, DEFAULT_OSRM_URL);
    }
}
