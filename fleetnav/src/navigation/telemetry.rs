//! Navigation telemetry snapshot.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::session::NavigationState;

/// Progress of the active navigation, recomputed on every tick.
///
/// Remaining distance and time are the sums over the steps from the
/// current step onwards; the arrival estimate is the sample timestamp plus
/// the remaining time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationTelemetry {
    /// Session state at the time of the snapshot.
    pub state: NavigationState,
    /// Whether the session is in an active state.
    pub is_navigating: bool,
    /// Index of the current step.
    pub step_index: usize,
    /// Instruction of the current step.
    pub current_maneuver: Option<String>,
    /// Distance from the vehicle to the current step's start point.
    pub distance_to_maneuver_m: Option<f64>,
    /// Length of the whole route.
    pub total_distance_m: Option<f64>,
    /// Distance still to cover.
    pub remaining_distance_m: Option<f64>,
    /// Time still to drive, in seconds.
    pub remaining_time_s: Option<f64>,
    /// Estimated arrival time.
    pub estimated_arrival: Option<DateTime<Utc>>,
}

impl NavigationTelemetry {
    /// Telemetry for a session without a route.
    pub fn inactive(state: NavigationState) -> Self {
        Self {
            state,
            is_navigating: state.is_active(),
            step_index: 0,
            current_maneuver: None,
            distance_to_maneuver_m: None,
            total_distance_m: None,
            remaining_distance_m: None,
            remaining_time_s: None,
            estimated_arrival: None,
        }
    }

    /// Remaining time rounded to whole minutes, for display.
    pub fn remaining_minutes(&self) -> Option<i64> {
        self.remaining_time_s.map(|s| (s / 60.0).round() as i64)
    }
}

/// Arrival estimate `at + remaining_s`.
pub fn estimate_arrival(at: DateTime<Utc>, remaining_s: f64) -> Option<DateTime<Utc>> {
    if !remaining_s.is_finite() || remaining_s < 0.0 {
        return None;
    }
    let millis = (remaining_s * 1_000.0).round() as i64;
    at.checked_add_signed(Duration::milliseconds(millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_estimate_arrival() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let eta = estimate_arrival(at, 600.0).unwrap();
        assert_eq!(eta, Utc.with_ymd_and_hms(2024, 5, 1, 12, 10, 0).unwrap());
    }

    #[test]
    fn test_estimate_arrival_rejects_negative() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert!(estimate_arrival(at, -1.0).is_none());
        assert!(estimate_arrival(at, f64::NAN).is_none());
    }

    #[test]
    fn test_inactive_telemetry() {
        let t = NavigationTelemetry::inactive(NavigationState::Idle);
        assert!(!t.is_navigating);
        assert_eq!(t.remaining_minutes(), None);

        let t = NavigationTelemetry::inactive(NavigationState::RouteRequested);
        assert!(t.is_navigating);
    }
}
