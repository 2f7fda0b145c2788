//! Geofence monitor.
//!
//! Owns a set of named circular regions and turns location samples into
//! `Entered`/`Exited` transitions.
//!
//! # Edge Triggering
//!
//! ```text
//! (unknown) --[first sample]--> Inside | Outside   (no event)
//! Outside   --[distance <= radius]--> Inside       (Entered)
//! Inside    --[distance >  radius]--> Outside      (Exited)
//! ```
//!
//! Re-evaluating at an unchanged membership emits nothing, so repeated
//! polling at the same position never produces a notification storm.

mod region;

pub use region::{
    region_id, GeofenceRegion, Membership, RegionRole, TransitionEvent, TransitionKind,
    DEFAULT_RADIUS_M,
};

use thiserror::Error;

use crate::geo::{Coordinate, GeoError, LocationSample};

/// Errors from region registration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeofenceError {
    /// Radius was zero, negative or not finite.
    #[error("Region '{id}' rejected: radius {radius_m} must be a positive finite number")]
    InvalidRadius { id: String, radius_m: f64 },

    /// Center could not be parsed.
    #[error("Region '{id}' rejected: {source}")]
    InvalidCenter {
        id: String,
        #[source]
        source: GeoError,
    },
}

/// Tracks membership of the vehicle in a set of regions.
///
/// Regions are evaluated in registration order, so transitions for one
/// sample are reported in a stable order.
#[derive(Debug, Default)]
pub struct GeofenceMonitor {
    regions: Vec<GeofenceRegion>,
}

impl GeofenceMonitor {
    /// Create an empty monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a region.
    ///
    /// Registering an id that already exists replaces that region and
    /// resets its membership to unknown.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        center: Coordinate,
        radius_m: f64,
    ) -> Result<(), GeofenceError> {
        let id = id.into();
        if !radius_m.is_finite() || radius_m <= 0.0 {
            tracing::warn!(region = %id, radius_m, "Rejecting geofence with invalid radius");
            return Err(GeofenceError::InvalidRadius { id, radius_m });
        }

        let region = GeofenceRegion::new(id.clone(), center, radius_m);
        match self.regions.iter_mut().find(|r| r.id() == id) {
            Some(existing) => *existing = region,
            None => self.regions.push(region),
        }

        tracing::debug!(
            region = %id,
            center = %center,
            radius_m,
            "Geofence registered"
        );
        Ok(())
    }

    /// Register a region whose center is given in `"lat, lon"` form.
    pub fn register_str(
        &mut self,
        id: impl Into<String>,
        center: &str,
        radius_m: f64,
    ) -> Result<(), GeofenceError> {
        let id = id.into();
        let center = match Coordinate::parse(center) {
            Ok(c) => c,
            Err(source) => {
                tracing::warn!(region = %id, error = %source, "Rejecting geofence with invalid center");
                return Err(GeofenceError::InvalidCenter { id, source });
            }
        };
        self.register(id, center, radius_m)
    }

    /// Remove a region. Returns whether it existed.
    pub fn unregister(&mut self, id: &str) -> bool {
        let before = self.regions.len();
        self.regions.retain(|r| r.id() != id);
        before != self.regions.len()
    }

    /// Remove all regions.
    pub fn clear(&mut self) {
        self.regions.clear();
    }

    /// Evaluate a sample against every region.
    pub fn evaluate(&mut self, sample: &LocationSample) -> Vec<TransitionEvent> {
        self.evaluate_point(&sample.coordinate)
    }

    /// Evaluate a bare coordinate against every region.
    pub fn evaluate_point(&mut self, point: &Coordinate) -> Vec<TransitionEvent> {
        self.regions
            .iter_mut()
            .filter_map(|region| {
                region.evaluate(point).map(|kind| TransitionEvent {
                    region_id: region.id().to_string(),
                    kind,
                })
            })
            .collect()
    }

    /// Last-known membership of a region (`None` if unknown or unregistered).
    pub fn membership(&self, id: &str) -> Option<Membership> {
        self.region(id).and_then(|r| r.membership())
    }

    /// Whether the vehicle is known to be inside the region.
    pub fn is_inside(&self, id: &str) -> bool {
        self.membership(id) == Some(Membership::Inside)
    }

    /// Look up a region.
    pub fn region(&self, id: &str) -> Option<&GeofenceRegion> {
        self.regions.iter().find(|r| r.id() == id)
    }

    /// All registered regions.
    pub fn regions(&self) -> &[GeofenceRegion] {
        &self.regions
    }

    /// Number of registered regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether no regions are registered.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
