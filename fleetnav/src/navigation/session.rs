//! Navigation session state machine.
//!
//! # State Machine
//!
//! ```text
//! Idle           --[request_route]-->               RouteRequested
//! RouteRequested --[route_ready]-->                 Navigating
//! Navigating     --[tick: off route > threshold]--> Rerouting
//! Rerouting      --[route_ready]-->                 Navigating (step 0)
//! Navigating     --[route_ready (refresh)]-->       Navigating (step 0)
//! active         --[complete]-->                    Completed
//! any            --[reset]-->                       Idle
//! ```
//!
//! The session is a pure state machine: it never calls the directions
//! gateway itself. Tick outcomes tell the owner when a route request is
//! needed, and the owner feeds results back through `route_ready`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::maneuver::{self, AnnouncementTracker, ManeuverState};
use super::telemetry::{estimate_arrival, NavigationTelemetry};
use super::{
    DEFAULT_ADVANCE_THRESHOLD_M, DEFAULT_ANNOUNCEMENT_THRESHOLD_M, DEFAULT_REROUTE_THRESHOLD_M,
};
use crate::directions::Route;
use crate::geo::{distance_to_polyline_m, Coordinate};

/// Navigation session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationState {
    /// No navigation in progress.
    Idle,
    /// Navigation started, waiting for the first route.
    RouteRequested,
    /// Following a route.
    Navigating,
    /// Off route, waiting for a replacement. The stale route is kept.
    Rerouting,
    /// Arrived and stopped.
    Completed,
}

impl NavigationState {
    /// Whether the navigation tick runs in this state.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            NavigationState::RouteRequested | NavigationState::Navigating | NavigationState::Rerouting
        )
    }
}

impl std::fmt::Display for NavigationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NavigationState::Idle => "idle",
            NavigationState::RouteRequested => "route_requested",
            NavigationState::Navigating => "navigating",
            NavigationState::Rerouting => "rerouting",
            NavigationState::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Which route the UI should display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RouteDisplay {
    /// Current position to pickup, before navigation starts.
    #[default]
    Pickup,
    /// Route to the destination, once navigation started.
    Destination,
}

/// Invalid session transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Navigation already active ({state})")]
    AlreadyActive { state: NavigationState },

    #[error("Navigation not active ({state})")]
    NotActive { state: NavigationState },
}

/// Distance thresholds used by the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationThresholds {
    /// Distance from the route polyline that triggers a reroute.
    pub reroute_m: f64,
    /// Distance to a step's start point at which the step is reached.
    pub advance_m: f64,
    /// Distance to the maneuver at which it is announced.
    pub announcement_m: f64,
}

impl Default for NavigationThresholds {
    fn default() -> Self {
        Self {
            reroute_m: DEFAULT_REROUTE_THRESHOLD_M,
            advance_m: DEFAULT_ADVANCE_THRESHOLD_M,
            announcement_m: DEFAULT_ANNOUNCEMENT_THRESHOLD_M,
        }
    }
}

/// Result of a navigation tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Session not active; nothing to do.
    Inactive,
    /// No usable route yet; the owner should make sure a request is in flight.
    AwaitingRoute,
    /// Vehicle left the route; a new route is needed.
    RerouteRequired { off_route_m: f64 },
    /// Maneuver refreshed.
    Updated {
        advanced: bool,
        announcement: Option<String>,
    },
}

/// Turn-by-turn state for one trip.
#[derive(Debug)]
pub struct NavigationSession {
    trip_id: String,
    state: NavigationState,
    display: RouteDisplay,
    route: Option<Route>,
    polyline: Vec<Coordinate>,
    step_index: usize,
    maneuver: Option<ManeuverState>,
    announcements: AnnouncementTracker,
    thresholds: NavigationThresholds,
    reroute_count: u32,
}

impl NavigationSession {
    /// Create an idle session for `trip_id`.
    pub fn new(trip_id: impl Into<String>, thresholds: NavigationThresholds) -> Self {
        Self {
            trip_id: trip_id.into(),
            state: NavigationState::Idle,
            display: RouteDisplay::Pickup,
            route: None,
            polyline: Vec::new(),
            step_index: 0,
            maneuver: None,
            announcements: AnnouncementTracker::new(),
            thresholds,
            reroute_count: 0,
        }
    }

    pub fn trip_id(&self) -> &str {
        &self.trip_id
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn display(&self) -> RouteDisplay {
        self.display
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn maneuver(&self) -> Option<&ManeuverState> {
        self.maneuver.as_ref()
    }

    pub fn last_announcement(&self) -> Option<&str> {
        self.announcements.last()
    }

    /// Number of reroutes since navigation started.
    pub fn reroute_count(&self) -> u32 {
        self.reroute_count
    }

    pub fn is_navigating(&self) -> bool {
        self.state.is_active()
    }

    /// Begin navigation: `Idle -> RouteRequested`.
    pub fn request_route(&mut self) -> Result<(), SessionError> {
        if self.state != NavigationState::Idle {
            return Err(SessionError::AlreadyActive { state: self.state });
        }
        self.state = NavigationState::RouteRequested;
        self.display = RouteDisplay::Destination;
        tracing::info!(trip_id = %self.trip_id, "Navigation route requested");
        Ok(())
    }

    /// Install a freshly computed navigation route.
    ///
    /// Valid in every active state. The step index resets to 0. A first
    /// route or a reroute measures the first step as is. A refresh while
    /// already `Navigating` starts under the vehicle, so it is advanced past
    /// that starting step straight to the upcoming maneuver.
    ///
    /// Returns an announcement if the maneuver is close and differs from the
    /// last one announced.
    pub fn route_ready(
        &mut self,
        route: Route,
        position: Option<&Coordinate>,
    ) -> Result<Option<String>, SessionError> {
        if !self.state.is_active() {
            return Err(SessionError::NotActive { state: self.state });
        }

        let previous = self.state;
        let advance_m = self.thresholds.advance_m;
        self.polyline = route.polyline();
        self.maneuver = position.and_then(|p| {
            if previous == NavigationState::Navigating {
                maneuver::advance(&route, 0, p, advance_m)
            } else {
                maneuver::measure(&route, 0, p)
            }
        });
        self.step_index = self.maneuver.as_ref().map_or(0, |m| m.step_index);
        self.route = Some(route);
        self.state = NavigationState::Navigating;

        tracing::info!(
            trip_id = %self.trip_id,
            from = %previous,
            steps = self.route.as_ref().map_or(0, |r| r.step_count()),
            "Navigation route installed"
        );

        let threshold = self.thresholds.announcement_m;
        Ok(self
            .maneuver
            .as_ref()
            .and_then(|m| self.announcements.offer(m, threshold)))
    }

    /// Run one navigation tick for `position`.
    ///
    /// Reroute detection runs first; a tick that triggers a reroute does
    /// not also advance against the stale route.
    pub fn tick(&mut self, position: &Coordinate) -> TickOutcome {
        match self.state {
            NavigationState::Idle | NavigationState::Completed => return TickOutcome::Inactive,
            NavigationState::RouteRequested | NavigationState::Rerouting => {
                return TickOutcome::AwaitingRoute
            }
            NavigationState::Navigating => {}
        }

        let Some(route) = self.route.as_ref() else {
            return TickOutcome::AwaitingRoute;
        };

        if let Some(off_route_m) = distance_to_polyline_m(position, &self.polyline) {
            if off_route_m > self.thresholds.reroute_m {
                self.state = NavigationState::Rerouting;
                self.reroute_count += 1;
                tracing::info!(
                    trip_id = %self.trip_id,
                    off_route_m = format!("{:.1}", off_route_m),
                    reroutes = self.reroute_count,
                    "Vehicle off route, rerouting"
                );
                return TickOutcome::RerouteRequired { off_route_m };
            }
        }

        let before = self.step_index;
        let Some(current) = maneuver::advance(route, before, position, self.thresholds.advance_m)
        else {
            return TickOutcome::AwaitingRoute;
        };

        let advanced = current.step_index != before;
        if advanced {
            tracing::debug!(
                trip_id = %self.trip_id,
                step = current.step_index,
                instruction = %current.instruction,
                "Advanced to next step"
            );
        }

        let announcement = self
            .announcements
            .offer(&current, self.thresholds.announcement_m);
        self.step_index = current.step_index;
        self.maneuver = Some(current);

        TickOutcome::Updated {
            advanced,
            announcement,
        }
    }

    /// Finish navigation: active state `-> Completed`.
    ///
    /// The destination check is the caller's job.
    pub fn complete(&mut self) -> Result<(), SessionError> {
        if !self.state.is_active() {
            return Err(SessionError::NotActive { state: self.state });
        }
        self.state = NavigationState::Completed;
        tracing::info!(trip_id = %self.trip_id, "Navigation completed");
        Ok(())
    }

    /// Drop the route and return to `Idle`.
    pub fn reset(&mut self) {
        self.state = NavigationState::Idle;
        self.display = RouteDisplay::Pickup;
        self.route = None;
        self.polyline.clear();
        self.step_index = 0;
        self.maneuver = None;
        self.announcements.reset();
        self.reroute_count = 0;
    }

    /// Progress figures as of `at`.
    pub fn telemetry(&self, at: DateTime<Utc>) -> NavigationTelemetry {
        let Some(route) = self.route.as_ref() else {
            return NavigationTelemetry::inactive(self.state);
        };

        let remaining_distance_m = route.remaining_distance_m(self.step_index);
        let remaining_time_s = route.remaining_duration_s(self.step_index);

        NavigationTelemetry {
            state: self.state,
            is_navigating: self.state.is_active(),
            step_index: self.step_index,
            current_maneuver: self.maneuver.as_ref().map(|m| m.instruction.clone()),
            distance_to_maneuver_m: self.maneuver.as_ref().map(|m| m.distance_m),
            total_distance_m: Some(route.distance_m()),
            remaining_distance_m: Some(remaining_distance_m),
            remaining_time_s: Some(remaining_time_s),
            estimated_arrival: estimate_arrival(at, remaining_time_s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directions::RouteStep;
    use crate::geo::{destination_point, haversine_m};
    use chrono::TimeZone;

    fn start() -> Coordinate {
        Coordinate::new(28.70, 77.10).unwrap()
    }

    /// Three steps, 5000 m and 600 s total, heading east.
    fn route_from(origin: Coordinate) -> Route {
        let p1 = destination_point(&origin, 90.0, 2_000.0);
        let p2 = destination_point(&origin, 90.0, 4_500.0);
        let p3 = destination_point(&origin, 90.0, 5_000.0);
        Route::new(
            vec![
                RouteStep::new("Head east on Ring Road", vec![origin, p1], 2_000.0, 240.0),
                RouteStep::new("Continue onto Outer Ring Road", vec![p1, p2], 2_500.0, 300.0),
                RouteStep::new("Turn left onto Mall Road", vec![p2, p3], 500.0, 60.0),
            ],
            5_000.0,
            600.0,
        )
        .unwrap()
    }

    fn navigating_session() -> NavigationSession {
        let mut session = NavigationSession::new("42", NavigationThresholds::default());
        session.request_route().unwrap();
        session.route_ready(route_from(start()), Some(&start())).unwrap();
        session
    }

    #[test]
    fn test_request_route_from_idle_only() {
        let mut session = NavigationSession::new("42", NavigationThresholds::default());
        assert_eq!(session.display(), RouteDisplay::Pickup);

        session.request_route().unwrap();
        assert_eq!(session.state(), NavigationState::RouteRequested);
        assert_eq!(session.display(), RouteDisplay::Destination);
        assert!(session.is_navigating());

        assert_eq!(
            session.request_route(),
            Err(SessionError::AlreadyActive {
                state: NavigationState::RouteRequested
            })
        );
    }

    #[test]
    fn test_route_ready_measures_first_step() {
        let sample = destination_point(&start(), 180.0, 5.0);
        let mut session = NavigationSession::new("42", NavigationThresholds::default());
        session.request_route().unwrap();
        let announcement = session
            .route_ready(route_from(start()), Some(&sample))
            .unwrap();

        assert_eq!(session.state(), NavigationState::Navigating);
        assert_eq!(session.step_index(), 0);
        let maneuver = session.maneuver().unwrap();
        assert_eq!(maneuver.instruction, "Head east on Ring Road");
        assert!((maneuver.distance_m - haversine_m(&sample, &start())).abs() < 1e-9);
        assert_eq!(announcement.as_deref(), Some("Head east on Ring Road"));
    }

    #[test]
    fn test_route_ready_rejected_when_idle() {
        let mut session = NavigationSession::new("42", NavigationThresholds::default());
        let err = session.route_ready(route_from(start()), None).unwrap_err();
        assert_eq!(
            err,
            SessionError::NotActive {
                state: NavigationState::Idle
            }
        );
        assert!(session.route().is_none());
    }

    #[test]
    fn test_tick_while_awaiting_route() {
        let mut session = NavigationSession::new("42", NavigationThresholds::default());
        assert_eq!(session.tick(&start()), TickOutcome::Inactive);
        session.request_route().unwrap();
        assert_eq!(session.tick(&start()), TickOutcome::AwaitingRoute);
    }

    #[test]
    fn test_tick_advances_near_step_start() {
        let mut session = navigating_session();
        let near_p1 = destination_point(&start(), 90.0, 1_990.0);

        let outcome = session.tick(&near_p1);
        assert!(matches!(outcome, TickOutcome::Updated { advanced: true, .. }));
        assert_eq!(session.step_index(), 1);
        assert_eq!(
            session.maneuver().unwrap().instruction,
            "Continue onto Outer Ring Road"
        );
    }

    #[test]
    fn test_tick_on_route_without_advance() {
        let mut session = navigating_session();
        let midway = destination_point(&start(), 90.0, 1_000.0);

        let outcome = session.tick(&midway);
        assert!(matches!(outcome, TickOutcome::Updated { advanced: false, .. }));
        assert_eq!(session.step_index(), 0);
        assert!((session.maneuver().unwrap().distance_m - 1_000.0).abs() < 1.0);
    }

    #[test]
    fn test_announcement_deduplicated_across_ticks() {
        let mut session = navigating_session();
        assert_eq!(session.last_announcement(), Some("Head east on Ring Road"));

        let nearby = destination_point(&start(), 90.0, 50.0);
        let outcome = session.tick(&nearby);
        assert_eq!(
            outcome,
            TickOutcome::Updated {
                advanced: false,
                announcement: None
            }
        );
    }

    #[test]
    fn test_off_route_triggers_reroute_without_advancing() {
        let mut session = navigating_session();
        let off = destination_point(&start(), 0.0, 60.0);

        let outcome = session.tick(&off);
        assert!(matches!(outcome, TickOutcome::RerouteRequired { off_route_m } if off_route_m > 50.0));
        assert_eq!(session.state(), NavigationState::Rerouting);
        assert_eq!(session.step_index(), 0);
        assert!(session.route().is_some());
        assert_eq!(session.reroute_count(), 1);

        // Stale route is not used for advancement while rerouting
        assert_eq!(session.tick(&off), TickOutcome::AwaitingRoute);
    }

    #[test]
    fn test_reroute_resets_step_index() {
        let mut session = navigating_session();
        session.tick(&destination_point(&start(), 90.0, 1_990.0));
        assert_eq!(session.step_index(), 1);

        let off = destination_point(&destination_point(&start(), 90.0, 2_500.0), 0.0, 80.0);
        assert!(matches!(session.tick(&off), TickOutcome::RerouteRequired { .. }));

        session.route_ready(route_from(off), Some(&off)).unwrap();
        assert_eq!(session.state(), NavigationState::Navigating);
        assert_eq!(session.step_index(), 0);
        assert_eq!(
            session.maneuver().unwrap().instruction,
            "Head east on Ring Road"
        );
    }

    #[test]
    fn test_refresh_while_navigating_restarts_from_new_route() {
        let mut session = navigating_session();
        session.tick(&destination_point(&start(), 90.0, 1_990.0));
        assert_eq!(session.step_index(), 1);

        // A refresh computed from 100 m past the vehicle is not under it
        let ahead = destination_point(&start(), 90.0, 2_100.0);
        let here = destination_point(&start(), 90.0, 2_000.0);
        session.route_ready(route_from(ahead), Some(&here)).unwrap();
        assert_eq!(session.state(), NavigationState::Navigating);
        assert_eq!(session.step_index(), 0);
    }

    #[test]
    fn test_refresh_skips_departure_under_vehicle() {
        let mut session = navigating_session();
        let here = destination_point(&start(), 90.0, 1_850.0);
        assert!(matches!(
            session.tick(&here),
            TickOutcome::Updated { .. }
        ));

        // Refreshed route from the vehicle: depart here, then a turn 150 m on
        let turn = destination_point(&here, 90.0, 150.0);
        let end = destination_point(&turn, 0.0, 1_000.0);
        let refreshed = Route::new(
            vec![
                RouteStep::new("Depart", vec![here, turn], 150.0, 20.0),
                RouteStep::new("Turn left onto Mall Road", vec![turn, end], 1_000.0, 120.0),
            ],
            1_150.0,
            140.0,
        )
        .unwrap();

        let first = session.route_ready(refreshed.clone(), Some(&here)).unwrap();
        assert_eq!(session.step_index(), 1);
        assert_eq!(first.as_deref(), Some("Turn left onto Mall Road"));

        // A second refresh announces nothing new
        let second = session.route_ready(refreshed, Some(&here)).unwrap();
        assert_eq!(session.step_index(), 1);
        assert_eq!(second, None);
        assert_eq!(
            session.tick(&here),
            TickOutcome::Updated {
                advanced: false,
                announcement: None
            }
        );
    }

    #[test]
    fn test_telemetry_sums_from_current_step() {
        let mut session = navigating_session();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let t = session.telemetry(at);
        assert!(t.is_navigating);
        assert_eq!(t.total_distance_m, Some(5_000.0));
        assert_eq!(t.remaining_distance_m, Some(5_000.0));
        assert_eq!(t.remaining_time_s, Some(600.0));
        assert_eq!(
            t.estimated_arrival,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 10, 0).unwrap())
        );

        session.tick(&destination_point(&start(), 90.0, 1_990.0));
        let t = session.telemetry(at);
        assert_eq!(t.step_index, 1);
        assert_eq!(t.remaining_distance_m, Some(3_000.0));
        assert_eq!(t.remaining_time_s, Some(360.0));
    }

    #[test]
    fn test_complete_and_reset() {
        let mut session = navigating_session();
        session.complete().unwrap();
        assert_eq!(session.state(), NavigationState::Completed);
        assert!(!session.is_navigating());
        assert_eq!(session.tick(&start()), TickOutcome::Inactive);
        assert!(session.complete().is_err());

        session.reset();
        assert_eq!(session.state(), NavigationState::Idle);
        assert!(session.route().is_none());
        assert_eq!(session.display(), RouteDisplay::Pickup);
        assert_eq!(session.last_announcement(), None);
    }

    #[test]
    fn test_step_index_monotonic_while_navigating() {
        let mut session = navigating_session();
        let path = [100.0, 1_995.0, 2_500.0, 1_000.0, 4_495.0, 4_800.0, 5_000.0];
        let mut last = 0;
        for d in path {
            session.tick(&destination_point(&start(), 90.0, d));
            assert!(session.step_index() >= last);
            last = session.step_index();
        }
        assert_eq!(last, 2);
    }
}
