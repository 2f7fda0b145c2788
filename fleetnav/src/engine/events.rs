//! Events and state snapshots published by the engine.

use serde::{Deserialize, Serialize};

use crate::directions::{GatewayError, RoutePurpose, RouteSummary};
use crate::geo::LocationSample;
use crate::geofence::{Membership, RegionRole, TransitionKind};
use crate::navigation::{NavigationState, NavigationTelemetry, RouteDisplay};
use crate::scheduler::TickKind;

/// Something the UI layer should know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// The vehicle entered or left a trip region.
    GeofenceTransition {
        trip_id: String,
        region_id: String,
        role: RegionRole,
        kind: TransitionKind,
        /// Display label of the region's location.
        location: String,
    },

    /// A location sample was accepted.
    SampleUpdated { sample: LocationSample },

    /// A route for `purpose` was computed and installed.
    RouteReady {
        trip_id: String,
        purpose: RoutePurpose,
        summary: RouteSummary,
    },

    /// A route request failed; the previous route, if any, stays in use.
    RouteFailed {
        trip_id: String,
        purpose: RoutePurpose,
        error: GatewayError,
    },

    /// Navigation progress after a tick.
    Telemetry {
        trip_id: String,
        telemetry: NavigationTelemetry,
    },

    /// A maneuver should be called out.
    Announcement { trip_id: String, text: String },

    /// Navigation was stopped at the destination.
    NavigationEnded { trip_id: String },

    /// All trip state was torn down.
    CleanedUp { trip_id: Option<String> },
}

impl EngineEvent {
    /// Trip the event belongs to.
    pub fn trip_id(&self) -> Option<&str> {
        match self {
            EngineEvent::GeofenceTransition { trip_id, .. }
            | EngineEvent::RouteReady { trip_id, .. }
            | EngineEvent::RouteFailed { trip_id, .. }
            | EngineEvent::Telemetry { trip_id, .. }
            | EngineEvent::Announcement { trip_id, .. }
            | EngineEvent::NavigationEnded { trip_id } => Some(trip_id),
            EngineEvent::CleanedUp { trip_id } => trip_id.as_deref(),
            EngineEvent::SampleUpdated { .. } => None,
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::GeofenceTransition { .. } => "geofence_transition",
            EngineEvent::SampleUpdated { .. } => "sample_updated",
            EngineEvent::RouteReady { .. } => "route_ready",
            EngineEvent::RouteFailed { .. } => "route_failed",
            EngineEvent::Telemetry { .. } => "telemetry",
            EngineEvent::Announcement { .. } => "announcement",
            EngineEvent::NavigationEnded { .. } => "navigation_ended",
            EngineEvent::CleanedUp { .. } => "cleaned_up",
        }
    }
}

/// Latest engine state, published after every command and tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub trip_id: Option<String>,
    pub navigation_state: Option<NavigationState>,
    pub display: RouteDisplay,
    pub telemetry: Option<NavigationTelemetry>,
    pub pickup_membership: Option<Membership>,
    pub destination_membership: Option<Membership>,
    pub pickup_preview: Option<RouteSummary>,
    pub destination_preview: Option<RouteSummary>,
    pub active_timers: Vec<TickKind>,
    pub last_sample: Option<LocationSample>,
}

impl EngineSnapshot {
    /// Whether navigation is in an active state.
    pub fn is_navigating(&self) -> bool {
        self.navigation_state.is_some_and(|s| s.is_active())
    }

    /// Whether the vehicle is known to be inside the pickup region.
    pub fn at_pickup(&self) -> bool {
        self.pickup_membership == Some(Membership::Inside)
    }

    /// Whether the vehicle is known to be inside the destination region.
    pub fn at_destination(&self) -> bool {
        self.destination_membership == Some(Membership::Inside)
    }
}
