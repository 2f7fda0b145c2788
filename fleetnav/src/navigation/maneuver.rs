//! Maneuver advancement and announcement de-duplication.
//!
//! Each navigation tick measures the distance from the vehicle to the start
//! point of the current step. Close enough to it (below the advance
//! threshold) and with another step available, the session moves on to the
//! next step and re-measures against that step instead.

use serde::{Deserialize, Serialize};

use crate::directions::Route;
use crate::geo::{haversine_m, Coordinate};

/// Current maneuver as seen from the latest position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManeuverState {
    /// Index of the step the maneuver belongs to.
    pub step_index: usize,
    /// Instruction of that step.
    pub instruction: String,
    /// Distance from the position to the step's start point.
    pub distance_m: f64,
}

/// Measure the maneuver at `step_index` without advancing.
pub fn measure(route: &Route, step_index: usize, position: &Coordinate) -> Option<ManeuverState> {
    let step = route.step(step_index)?;
    let distance_m = step
        .start_point()
        .map_or(0.0, |start| haversine_m(position, start));

    Some(ManeuverState {
        step_index,
        instruction: step.instruction.clone(),
        distance_m,
    })
}

/// Measure the current maneuver, advancing one step when the vehicle has
/// reached the current step's start point.
///
/// At most one step is advanced per call; the index never decreases.
pub fn advance(
    route: &Route,
    step_index: usize,
    position: &Coordinate,
    advance_threshold_m: f64,
) -> Option<ManeuverState> {
    let current = measure(route, step_index, position)?;
    let has_next = step_index + 1 < route.step_count();

    if current.distance_m < advance_threshold_m && has_next {
        measure(route, step_index + 1, position)
    } else {
        Some(current)
    }
}

/// Suppresses consecutive identical announcements.
#[derive(Debug, Default, Clone)]
pub struct AnnouncementTracker {
    last: Option<String>,
}

impl AnnouncementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer the current maneuver for announcement.
    ///
    /// Returns the announcement text when the maneuver is within
    /// `threshold_m` and the text differs from the last one emitted.
    pub fn offer(&mut self, maneuver: &ManeuverState, threshold_m: f64) -> Option<String> {
        if maneuver.distance_m > threshold_m {
            return None;
        }
        if self.last.as_deref() == Some(maneuver.instruction.as_str()) {
            return None;
        }
        self.last = Some(maneuver.instruction.clone());
        self.last.clone()
    }

    /// Last emitted announcement.
    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }

    /// Forget the last announcement.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
