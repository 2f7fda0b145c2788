//! User-facing notifications.
//!
//! The engine decides *whether* an event deserves a notification and *what*
//! it says; delivering it (push, local banner, speech) is the job of a
//! [`NotificationSink`] supplied by the host application.

use serde::{Deserialize, Serialize};

use crate::directions::RoutePurpose;
use crate::engine::EngineEvent;
use crate::geofence::{RegionRole, TransitionKind};

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    ArrivedAtPickup,
    LeftPickup,
    ArrivedAtDestination,
    LeftDestination,
    RouteUnavailable,
    /// Navigation ended; the driver should complete the post-trip inspection.
    PostTripInspection,
    Maneuver,
}

/// A notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub trip_id: String,
    pub title: String,
    pub body: String,
}

impl Notification {
    /// Decide the notification for an engine event, if any.
    pub fn for_event(event: &EngineEvent) -> Option<Self> {
        match event {
            EngineEvent::GeofenceTransition {
                trip_id,
                role,
                kind,
                location,
                ..
            } => {
                let (kind, title, body) = match (role, kind) {
                    (RegionRole::Pickup, TransitionKind::Entered) => (
                        NotificationKind::ArrivedAtPickup,
                        "Arrived at pickup",
                        format!("You have arrived at the pickup location: {}", location),
                    ),
                    (RegionRole::Pickup, TransitionKind::Exited) => (
                        NotificationKind::LeftPickup,
                        "Left pickup",
                        format!("You have left the pickup location: {}", location),
                    ),
                    (RegionRole::Destination, TransitionKind::Entered) => (
                        NotificationKind::ArrivedAtDestination,
                        "Arrived at destination",
                        format!("You have arrived at the destination: {}", location),
                    ),
                    (RegionRole::Destination, TransitionKind::Exited) => (
                        NotificationKind::LeftDestination,
                        "Left destination",
                        format!("You have left the destination: {}", location),
                    ),
                };
                Some(Self {
                    kind,
                    trip_id: trip_id.clone(),
                    title: title.to_string(),
                    body,
                })
            }

            // Only the route the driver is following is worth interrupting for
            EngineEvent::RouteFailed {
                trip_id,
                purpose: RoutePurpose::Navigation,
                error,
            } => Some(Self {
                kind: NotificationKind::RouteUnavailable,
                trip_id: trip_id.clone(),
                title: "Route unavailable".to_string(),
                body: format!("Could not compute a route ({}). Retrying shortly.", error),
            }),

            EngineEvent::NavigationEnded { trip_id } => Some(Self {
                kind: NotificationKind::PostTripInspection,
                trip_id: trip_id.clone(),
                title: "Trip completed".to_string(),
                body: "Navigation ended. Please complete the post-trip inspection.".to_string(),
            }),

            EngineEvent::Announcement { trip_id, text } => Some(Self {
                kind: NotificationKind::Maneuver,
                trip_id: trip_id.clone(),
                title: "Next maneuver".to_string(),
                body: text.clone(),
            }),

            EngineEvent::RouteFailed { .. }
            | EngineEvent::SampleUpdated { .. }
            | EngineEvent::RouteReady { .. }
            | EngineEvent::Telemetry { .. }
            | EngineEvent::CleanedUp { .. } => None,
        }
    }
}

/// Delivers notifications. Must not block.
pub trait NotificationSink: Send + Sync + 'static {
    fn deliver(&self, notification: &Notification);
}

/// Sink that writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, notification: &Notification) {
        tracing::info!(
            trip_id = %notification.trip_id,
            kind = ?notification.kind,
            title = %notification.title,
            "{}",
            notification.body
        );
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::directions::GatewayError;
    use std::sync::Mutex;

    /// Sink collecting everything it receives.
    #[derive(Default)]
    pub struct RecordingSink {
        pub delivered: Mutex<Vec<Notification>>,
    }

    impl NotificationSink for RecordingSink {
        fn deliver(&self, notification: &Notification) {
            self.delivered.lock().unwrap().push(notification.clone());
        }
    }

    fn transition(role: RegionRole, kind: TransitionKind) -> EngineEvent {
        EngineEvent::GeofenceTransition {
            trip_id: "42".into(),
            region_id: crate::geofence::region_id(role, "42"),
            role,
            kind,
            location: "28.70000, 77.10000".into(),
        }
    }

    #[test]
    fn test_pickup_arrival_uses_location_label() {
        let n = Notification::for_event(&transition(RegionRole::Pickup, TransitionKind::Entered))
            .unwrap();
        assert_eq!(n.kind, NotificationKind::ArrivedAtPickup);
        assert!(n.body.ends_with("28.70000, 77.10000"));
    }

    #[test]
    fn test_destination_exit() {
        let n = Notification::for_event(&transition(
            RegionRole::Destination,
            TransitionKind::Exited,
        ))
        .unwrap();
        assert_eq!(n.kind, NotificationKind::LeftDestination);
    }

    #[test]
    fn test_only_navigation_route_failures_notify() {
        let failed = |purpose| EngineEvent::RouteFailed {
            trip_id: "42".into(),
            purpose,
            error: GatewayError::ProviderUnavailable("timeout".into()),
        };
        assert_eq!(
            Notification::for_event(&failed(RoutePurpose::Navigation))
                .unwrap()
                .kind,
            NotificationKind::RouteUnavailable
        );
        assert!(Notification::for_event(&failed(RoutePurpose::PickupPreview)).is_none());
    }

    #[test]
    fn test_navigation_ended_prompts_inspection() {
        let n = Notification::for_event(&EngineEvent::NavigationEnded {
            trip_id: "42".into(),
        })
        .unwrap();
        assert_eq!(n.kind, NotificationKind::PostTripInspection);
    }

    #[test]
    fn test_cleanup_is_silent() {
        let event = EngineEvent::CleanedUp { trip_id: None };
        assert!(Notification::for_event(&event).is_none());
    }

    #[test]
    fn test_recording_sink() {
        let sink = RecordingSink::default();
        let n = Notification::for_event(&EngineEvent::Announcement {
            trip_id: "42".into(),
            text: "Turn left onto Mall Road".into(),
        })
        .unwrap();
        sink.deliver(&n);
        LogSink.deliver(&n);
        assert_eq!(sink.delivered.lock().unwrap().len(), 1);
    }
}
