//! Turn-by-turn navigation.
//!
//! A [`NavigationSession`] follows one route for one trip: it detects when
//! the vehicle drifts off the route, advances through the route's steps as
//! they are reached, and decides when a maneuver should be announced.
//!
//! Each tick runs in a fixed order:
//!
//! 1. **Reroute check** - distance from the sample to the route polyline.
//!    Above the reroute threshold the session enters `Rerouting` and the
//!    tick ends there.
//! 2. **Advancement** - distance to the current step's start point. Below
//!    the advance threshold, and with a next step available, move on.
//! 3. **Announcement** - at or below the announcement threshold, emit the
//!    instruction unless it was the last one emitted.

pub mod maneuver;
mod session;
mod telemetry;

pub use maneuver::{AnnouncementTracker, ManeuverState};
pub use session::{
    NavigationSession, NavigationState, NavigationThresholds, RouteDisplay, SessionError,
    TickOutcome,
};
pub use telemetry::{estimate_arrival, NavigationTelemetry};

/// Off-route distance that triggers a reroute.
pub const DEFAULT_REROUTE_THRESHOLD_M: f64 = 50.0;

/// Distance to a step's start point at which the step counts as reached.
pub const DEFAULT_ADVANCE_THRESHOLD_M: f64 = 20.0;

/// Distance to a maneuver at which it is announced.
pub const DEFAULT_ANNOUNCEMENT_THRESHOLD_M: f64 = 200.0;
