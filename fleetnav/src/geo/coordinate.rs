//! Validated WGS84 coordinates and location samples.
//!
//! Trip records carry positions as `"lat, lon"` strings. Everything inside
//! the engine works on [`Coordinate`], which can only be constructed from
//! finite, in-range values.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;

/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;

/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;

/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Errors produced while building or parsing coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// The input could not be interpreted as a coordinate pair.
    #[error("Invalid coordinate '{input}': {reason}")]
    InvalidCoordinate { input: String, reason: String },
}

impl GeoError {
    fn invalid(input: impl Into<String>, reason: impl Into<String>) -> Self {
        GeoError::InvalidCoordinate {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// A latitude/longitude pair in degrees.
///
/// Deserialization is validated like [`Coordinate::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
}

/// Unchecked wire form of [`Coordinate`].
#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = GeoError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Create a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        let input = format!("{}, {}", latitude, longitude);
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(GeoError::invalid(input, "components must be finite"));
        }
        if !(MIN_LAT..=MAX_LAT).contains(&latitude) {
            return Err(GeoError::invalid(input, "latitude out of range"));
        }
        if !(MIN_LON..=MAX_LON).contains(&longitude) {
            return Err(GeoError::invalid(input, "longitude out of range"));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Parse the `"lat, lon"` wire format used by trip records.
    pub fn parse(input: &str) -> Result<Self, GeoError> {
        input.parse()
    }

    /// Canonical `"lat, lon"` representation with 5 decimals (~1 m).
    pub fn to_wire(&self) -> String {
        format!("{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

impl FromStr for Coordinate {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',');
        let (Some(lat), Some(lon), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(GeoError::invalid(s, "expected exactly two comma-separated values"));
        };

        let latitude: f64 = lat
            .trim()
            .parse()
            .map_err(|_| GeoError::invalid(s, format!("latitude '{}' is not a number", lat.trim())))?;
        let longitude: f64 = lon.trim().parse().map_err(|_| {
            GeoError::invalid(s, format!("longitude '{}' is not a number", lon.trim()))
        })?;

        Coordinate::new(latitude, longitude).map_err(|e| match e {
            GeoError::InvalidCoordinate { reason, .. } => GeoError::invalid(s, reason),
        })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

/// A single location/heading fix from the external location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// Position of the vehicle.
    pub coordinate: Coordinate,
    /// Heading in degrees (0 = north), when the provider reports one.
    pub heading: Option<f64>,
    /// When the fix was taken.
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    /// Create a sample stamped with the current time.
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            heading: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a sample with an explicit timestamp.
    pub fn at(coordinate: Coordinate, timestamp: DateTime<Utc>) -> Self {
        Self {
            coordinate,
            heading: None,
            timestamp,
        }
    }

    /// Attach a heading. Non-finite headings are dropped; others are
    /// normalised to 0-360.
    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = heading.is_finite().then(|| heading.rem_euclid(360.0));
        self
    }
}
