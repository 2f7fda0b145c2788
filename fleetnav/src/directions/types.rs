//! Route model and gateway error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::Coordinate;

/// Errors returned by a directions provider.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum GatewayError {
    /// The provider answered but found no route between the points.
    #[error("No route found")]
    NoRouteFound,

    /// The provider could not be reached or failed to answer.
    #[error("Directions provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider rejected the request parameters.
    #[error("Invalid directions request: {0}")]
    InvalidInput(String),
}

/// Why a route was requested.
///
/// Requests are tracked per purpose: at most one request of each purpose is
/// in flight at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoutePurpose {
    /// Current position to the pickup point (shown before the trip starts).
    PickupPreview,
    /// Pickup point to destination (shown before the trip starts).
    DestinationPreview,
    /// Current position to destination while navigating.
    Navigation,
}

impl RoutePurpose {
    /// Short name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutePurpose::PickupPreview => "pickup_preview",
            RoutePurpose::DestinationPreview => "destination_preview",
            RoutePurpose::Navigation => "navigation",
        }
    }
}

impl std::fmt::Display for RoutePurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One maneuver of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    /// Instruction to show/announce for this maneuver.
    pub instruction: String,
    /// Geometry of the step; the first point is where the maneuver happens.
    pub points: Vec<Coordinate>,
    /// Length of the step in meters.
    pub distance_m: f64,
    /// Expected travel time of the step in seconds.
    pub duration_s: f64,
}

impl RouteStep {
    /// Create a step.
    pub fn new(
        instruction: impl Into<String>,
        points: Vec<Coordinate>,
        distance_m: f64,
        duration_s: f64,
    ) -> Self {
        Self {
            instruction: instruction.into(),
            points,
            distance_m,
            duration_s,
        }
    }

    /// Where the maneuver of this step takes place.
    pub fn start_point(&self) -> Option<&Coordinate> {
        self.points.first()
    }
}

/// Compact route figures for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    /// Total length in meters.
    pub distance_m: f64,
    /// Total expected duration in seconds.
    pub duration_s: f64,
    /// Number of maneuvers.
    pub step_count: usize,
}

/// A computed route. Immutable once built; replaced wholesale on reroute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    steps: Vec<RouteStep>,
    distance_m: f64,
    duration_s: f64,
}

impl Route {
    /// Build a route from its steps and totals.
    ///
    /// Fails with [`GatewayError::NoRouteFound`] when there are no steps or a
    /// step has no geometry, since such a route cannot be navigated.
    pub fn new(
        steps: Vec<RouteStep>,
        distance_m: f64,
        duration_s: f64,
    ) -> Result<Self, GatewayError> {
        if steps.is_empty() || steps.iter().any(|s| s.points.is_empty()) {
            return Err(GatewayError::NoRouteFound);
        }
        Ok(Self {
            steps,
            distance_m: distance_m.max(0.0),
            duration_s: duration_s.max(0.0),
        })
    }

    /// All steps in order.
    pub fn steps(&self) -> &[RouteStep] {
        &self.steps
    }

    /// Step at `index`, if it exists.
    pub fn step(&self, index: usize) -> Option<&RouteStep> {
        self.steps.get(index)
    }

    /// Number of steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Total length in meters.
    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    /// Total expected duration in seconds.
    pub fn duration_s(&self) -> f64 {
        self.duration_s
    }

    /// Full route geometry: step points concatenated, with the shared
    /// point between consecutive steps kept once.
    pub fn polyline(&self) -> Vec<Coordinate> {
        let mut line: Vec<Coordinate> = Vec::new();
        for point in self.steps.iter().flat_map(|s| s.points.iter()) {
            if line.last() != Some(point) {
                line.push(*point);
            }
        }
        line
    }

    /// Distance left from the start of step `from_step` to the end.
    pub fn remaining_distance_m(&self, from_step: usize) -> f64 {
        self.steps.iter().skip(from_step).map(|s| s.distance_m).sum()
    }

    /// Time left from the start of step `from_step` to the end.
    pub fn remaining_duration_s(&self, from_step: usize) -> f64 {
        self.steps.iter().skip(from_step).map(|s| s.duration_s).sum()
    }

    /// Display figures.
    pub fn summary(&self) -> RouteSummary {
        RouteSummary {
            distance_m: self.distance_m,
            duration_s: self.duration_s,
            step_count: self.steps.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn three_step_route() -> Route {
        Route::new(
            vec![
                RouteStep::new("Head north", vec![c(0.0, 0.0), c(0.01, 0.0)], 1_000.0, 100.0),
                RouteStep::new("Turn right", vec![c(0.01, 0.0), c(0.01, 0.02)], 2_500.0, 200.0),
                RouteStep::new("Arrive", vec![c(0.01, 0.02)], 1_500.0, 50.0),
            ],
            5_000.0,
            350.0,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_route_rejected() {
        assert_eq!(Route::new(vec![], 0.0, 0.0), Err(GatewayError::NoRouteFound));
    }

    #[test]
    fn test_step_without_points_rejected() {
        let steps = vec![RouteStep::new("Head north", vec![], 10.0, 1.0)];
        assert_eq!(Route::new(steps, 10.0, 1.0), Err(GatewayError::NoRouteFound));
    }

    #[test]
    fn test_polyline_drops_shared_points() {
        let route = three_step_route();
        let line = route.polyline();
        assert_eq!(line, vec![c(0.0, 0.0), c(0.01, 0.0), c(0.01, 0.02)]);
    }

    #[test]
    fn test_remaining_figures() {
        let route = three_step_route();
        assert_eq!(route.remaining_distance_m(0), 5_000.0);
        assert_eq!(route.remaining_distance_m(1), 4_000.0);
        assert_eq!(route.remaining_duration_s(2), 50.0);
        assert_eq!(route.remaining_duration_s(3), 0.0);
    }

    #[test]
    fn test_summary() {
        let summary = three_step_route().summary();
        assert_eq!(summary.step_count, 3);
        assert_eq!(summary.distance_m, 5_000.0);
    }

    #[test]
    fn test_gateway_error_display() {
        let err = GatewayError::ProviderUnavailable("HTTP 503".to_string());
        assert!(err.to_string().contains("HTTP 503"));
    }
}
