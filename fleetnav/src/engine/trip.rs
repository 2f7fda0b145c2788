//! Trip binding input and its validated form.

use serde::{Deserialize, Serialize};

use crate::geo::{location_label, Coordinate, GeoError};

/// A trip handed to the engine by the host application.
///
/// Coordinates arrive as `"lat, lon"` strings and are validated when the
/// trip is bound. The two gate flags come from the inspection and
/// maintenance systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripBinding {
    pub trip_id: String,
    pub pickup: String,
    pub destination: String,
    /// Reverse-geocoded pickup label, if the host resolved one.
    pub pickup_label: Option<String>,
    /// Reverse-geocoded destination label, if the host resolved one.
    pub destination_label: Option<String>,
    pub pre_trip_inspection_completed: bool,
    pub vehicle_under_maintenance: bool,
}

impl TripBinding {
    /// A trip with no labels, inspection pending and vehicle in service.
    pub fn new(
        trip_id: impl Into<String>,
        pickup: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            trip_id: trip_id.into(),
            pickup: pickup.into(),
            destination: destination.into(),
            pickup_label: None,
            destination_label: None,
            pre_trip_inspection_completed: false,
            vehicle_under_maintenance: false,
        }
    }

    pub fn with_pickup_label(mut self, label: impl Into<String>) -> Self {
        self.pickup_label = Some(label.into());
        self
    }

    pub fn with_destination_label(mut self, label: impl Into<String>) -> Self {
        self.destination_label = Some(label.into());
        self
    }

    pub fn with_inspection_completed(mut self, completed: bool) -> Self {
        self.pre_trip_inspection_completed = completed;
        self
    }

    pub fn with_under_maintenance(mut self, under_maintenance: bool) -> Self {
        self.vehicle_under_maintenance = under_maintenance;
        self
    }

    /// Parse both coordinates. Fails on the first invalid one.
    pub(crate) fn resolve(&self) -> Result<ActiveTrip, GeoError> {
        let pickup = Coordinate::parse(&self.pickup)?;
        let destination = Coordinate::parse(&self.destination)?;

        Ok(ActiveTrip {
            trip_id: self.trip_id.clone(),
            pickup,
            destination,
            pickup_label: location_label(self.pickup_label.as_deref(), &pickup),
            destination_label: location_label(self.destination_label.as_deref(), &destination),
            gates: TripGates {
                pre_trip_inspection_completed: self.pre_trip_inspection_completed,
                vehicle_under_maintenance: self.vehicle_under_maintenance,
            },
        })
    }
}

/// Externally evaluated conditions for starting navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TripGates {
    pub pre_trip_inspection_completed: bool,
    pub vehicle_under_maintenance: bool,
}

/// A bound trip with validated coordinates.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ActiveTrip {
    pub trip_id: String,
    pub pickup: Coordinate,
    pub destination: Coordinate,
    pub pickup_label: String,
    pub destination_label: String,
    pub gates: TripGates,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_valid() {
        let trip = TripBinding::new("42", "28.70,77.10", "28.6139, 77.2090")
            .with_destination_label("Connaught Place")
            .with_inspection_completed(true)
            .resolve()
            .unwrap();

        assert_eq!(trip.pickup, Coordinate::new(28.70, 77.10).unwrap());
        assert_eq!(trip.pickup_label, "28.70000, 77.10000");
        assert_eq!(trip.destination_label, "Connaught Place");
        assert!(trip.gates.pre_trip_inspection_completed);
        assert!(!trip.gates.vehicle_under_maintenance);
    }

    #[test]
    fn test_resolve_rejects_bad_pickup() {
        let err = TripBinding::new("42", "abc, 77.1", "28.6139, 77.2090")
            .resolve()
            .unwrap_err();
        assert!(matches!(err, GeoError::InvalidCoordinate { .. }));
    }

    #[test]
    fn test_resolve_rejects_bad_destination() {
        assert!(TripBinding::new("42", "28.70,77.10", "91.0, 0.0")
            .resolve()
            .is_err());
    }
}
