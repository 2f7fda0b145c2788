//! Geofence region and transition types.

use serde::{Deserialize, Serialize};

use crate::geo::{haversine_m, Coordinate};

/// Default geofence radius in meters.
pub const DEFAULT_RADIUS_M: f64 = 100.0;

/// Which end of a trip a region guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionRole {
    /// The pickup point; being inside gates starting navigation.
    Pickup,
    /// The destination; being inside gates stopping navigation.
    Destination,
}

impl RegionRole {
    /// Identifier prefix used for region ids.
    pub fn prefix(&self) -> &'static str {
        match self {
            RegionRole::Pickup => "pickup",
            RegionRole::Destination => "destination",
        }
    }

    /// Recover the role from a region id built by [`region_id`].
    pub fn from_region_id(id: &str) -> Option<Self> {
        if id.starts_with("pickup_") {
            Some(RegionRole::Pickup)
        } else if id.starts_with("destination_") {
            Some(RegionRole::Destination)
        } else {
            None
        }
    }
}

/// Region identifier for a trip, e.g. `pickup_42`.
pub fn region_id(role: RegionRole, trip_id: &str) -> String {
    format!("{}_{}", role.prefix(), trip_id)
}

/// Last-known membership of the tracked vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Membership {
    Inside,
    Outside,
}

impl Membership {
    fn from_inside(inside: bool) -> Self {
        if inside {
            Membership::Inside
        } else {
            Membership::Outside
        }
    }
}

/// Kind of a membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionKind {
    Entered,
    Exited,
}

/// A membership change of one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub region_id: String,
    pub kind: TransitionKind,
}

/// A circular zone with edge-triggered membership tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceRegion {
    id: String,
    center: Coordinate,
    radius_m: f64,
    membership: Option<Membership>,
}

impl GeofenceRegion {
    pub(super) fn new(id: String, center: Coordinate, radius_m: f64) -> Self {
        Self {
            id,
            center,
            radius_m,
            membership: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn center(&self) -> &Coordinate {
        &self.center
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Last-known membership; `None` until the first evaluation.
    pub fn membership(&self) -> Option<Membership> {
        self.membership
    }

    /// Update membership for `point`, returning the transition if it changed.
    ///
    /// The first evaluation only records the initial state.
    pub(super) fn evaluate(&mut self, point: &Coordinate) -> Option<TransitionKind> {
        let current = Membership::from_inside(haversine_m(&self.center, point) <= self.radius_m);
        let previous = self.membership.replace(current);

        match (previous, current) {
            (Some(Membership::Outside), Membership::Inside) => Some(TransitionKind::Entered),
            (Some(Membership::Inside), Membership::Outside) => Some(TransitionKind::Exited),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_id_roundtrip_role() {
        let id = region_id(RegionRole::Pickup, "42");
        assert_eq!(id, "pickup_42");
        assert_eq!(RegionRole::from_region_id(&id), Some(RegionRole::Pickup));
        assert_eq!(
            RegionRole::from_region_id("destination_42"),
            Some(RegionRole::Destination)
        );
        assert_eq!(RegionRole::from_region_id("depot_1"), None);
    }

    #[test]
    fn test_first_evaluation_is_not_a_transition() {
        let center = Coordinate::new(10.0, 10.0).unwrap();
        let mut region = GeofenceRegion::new("pickup_1".into(), center, 100.0);

        assert_eq!(region.evaluate(&center), None);
        assert_eq!(region.membership(), Some(Membership::Inside));
    }
}
