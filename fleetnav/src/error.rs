//! Engine error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::directions::GatewayError;
use crate::geo::GeoError;
use crate::geofence::GeofenceError;
use crate::navigation::SessionError;

/// Why a facade action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precondition {
    /// No trip is bound.
    NoTripBound,
    /// The pre-trip inspection has not been completed.
    PreTripInspectionIncomplete,
    /// The vehicle is under maintenance.
    VehicleUnderMaintenance,
    /// The vehicle is not inside the pickup region.
    NotAtPickup,
    /// The vehicle is not inside the destination region.
    NotAtDestination,
    /// Navigation is already running.
    AlreadyNavigating,
    /// Navigation is not running.
    NotNavigating,
}

impl std::fmt::Display for Precondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Precondition::NoTripBound => "no trip is bound",
            Precondition::PreTripInspectionIncomplete => "pre-trip inspection not completed",
            Precondition::VehicleUnderMaintenance => "vehicle is under maintenance",
            Precondition::NotAtPickup => "vehicle is not at the pickup location",
            Precondition::NotAtDestination => "vehicle has not arrived at the destination",
            Precondition::AlreadyNavigating => "navigation is already active",
            Precondition::NotNavigating => "navigation is not active",
        };
        f.write_str(s)
    }
}

/// Errors returned by engine operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A coordinate could not be parsed or is out of range.
    #[error(transparent)]
    InvalidCoordinate(#[from] GeoError),

    /// The directions provider could not produce a route.
    #[error("Route unavailable: {0}")]
    RouteUnavailable(#[from] GatewayError),

    /// The requested action is not allowed right now.
    #[error("Precondition not met: {0}")]
    PreconditionNotMet(Precondition),

    /// A geofence region could not be registered.
    #[error("Region registration failed: {0}")]
    RegionRegistrationFailed(#[from] GeofenceError),

    /// The engine configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The engine task has stopped.
    #[error("Engine stopped")]
    EngineStopped,
}

impl From<Precondition> for EngineError {
    fn from(p: Precondition) -> Self {
        EngineError::PreconditionNotMet(p)
    }
}

impl From<SessionError> for EngineError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::AlreadyActive { .. } => {
                EngineError::PreconditionNotMet(Precondition::AlreadyNavigating)
            }
            SessionError::NotActive { .. } => {
                EngineError::PreconditionNotMet(Precondition::NotNavigating)
            }
        }
    }
}

impl EngineError {
    /// The refused precondition, if this is a precondition error.
    pub fn precondition(&self) -> Option<Precondition> {
        match self {
            EngineError::PreconditionNotMet(p) => Some(*p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::navigation::NavigationState;

    #[test]
    fn test_precondition_display() {
        let err = EngineError::from(Precondition::NotAtPickup);
        assert_eq!(
            err.to_string(),
            "Precondition not met: vehicle is not at the pickup location"
        );
        assert_eq!(err.precondition(), Some(Precondition::NotAtPickup));
    }

    #[test]
    fn test_from_geo_error() {
        let err: EngineError = Coordinate::parse("abc, 77.1").unwrap_err().into();
        assert!(matches!(err, EngineError::InvalidCoordinate(_)));
        assert_eq!(err.precondition(), None);
    }

    #[test]
    fn test_from_session_error() {
        let err: EngineError = SessionError::NotActive {
            state: NavigationState::Idle,
        }
        .into();
        assert_eq!(err.precondition(), Some(Precondition::NotNavigating));
    }

    #[test]
    fn test_route_unavailable_display() {
        let err = EngineError::from(GatewayError::NoRouteFound);
        assert!(err.to_string().starts_with("Route unavailable"));
    }
}
