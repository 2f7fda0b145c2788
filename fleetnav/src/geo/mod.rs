//! Geometry utilities.
//!
//! Pure functions over [`Coordinate`]: great-circle distance and bearing,
//! point-in-circle tests for geofences, and nearest distance from a point
//! to a route polyline for off-route detection.
//!
//! Distances are in meters and bearings in degrees (0 = north, 90 = east).

mod coordinate;

pub use coordinate::{Coordinate, GeoError, LocationSample, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Earth radius in meters (WGS84 mean).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Great-circle distance between two coordinates in meters.
pub fn haversine_m(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Initial great-circle bearing from `from` to `to`, normalised to 0-360.
pub fn initial_bearing_deg(from: &Coordinate, to: &Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlon = (to.longitude - from.longitude).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Point reached by travelling `distance_m` from `origin` along `bearing_deg`.
///
/// Latitude is clamped to the valid range and longitude wrapped to
/// -180..180, so the result is always a valid [`Coordinate`].
pub fn destination_point(origin: &Coordinate, bearing_deg: f64, distance_m: f64) -> Coordinate {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    let latitude = lat2.to_degrees().clamp(MIN_LAT, MAX_LAT);
    let longitude = (lon2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;

    Coordinate {
        latitude,
        longitude,
    }
}

/// Whether `point` lies inside the circle of `radius_m` around `center`.
///
/// The boundary counts as inside.
pub fn is_within_radius(center: &Coordinate, radius_m: f64, point: &Coordinate) -> bool {
    haversine_m(center, point) <= radius_m
}

/// Shortest distance in meters from `point` to any segment of `polyline`.
///
/// Returns `None` for an empty polyline. A single-point polyline yields
/// the point-to-point distance.
pub fn distance_to_polyline_m(point: &Coordinate, polyline: &[Coordinate]) -> Option<f64> {
    match polyline {
        [] => None,
        [only] => Some(haversine_m(point, only)),
        _ => polyline
            .windows(2)
            .map(|w| haversine_m(point, &project_on_segment(point, &w[0], &w[1])))
            .min_by(|a, b| a.total_cmp(b)),
    }
}

/// Project `p` onto segment `a`-`b` on a local equirectangular plane.
///
/// Accurate for segments up to a few kilometres, which covers route steps.
fn project_on_segment(p: &Coordinate, a: &Coordinate, b: &Coordinate) -> Coordinate {
    let cos_lat = ((a.latitude + b.latitude) / 2.0).to_radians().cos();

    let dx = (b.longitude - a.longitude) * cos_lat;
    let dy = b.latitude - a.latitude;
    let px = (p.longitude - a.longitude) * cos_lat;
    let py = p.latitude - a.latitude;

    let seg_len_sq = dx * dx + dy * dy;
    if seg_len_sq < 1e-20 {
        return *a;
    }

    let t = ((px * dx + py * dy) / seg_len_sq).clamp(0.0, 1.0);

    Coordinate {
        latitude: a.latitude + t * (b.latitude - a.latitude),
        longitude: a.longitude + t * (b.longitude - a.longitude),
    }
}

/// Human-readable label for a place.
///
/// Uses the reverse-geocoded label when one was resolved; otherwise falls
/// back to the raw `"lat, lon"` pair. This is the only place a coordinate
/// is shown in place of an address.
pub fn location_label(resolved: Option<&str>, coordinate: &Coordinate) -> String {
    match resolved.map(str::trim) {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => coordinate.to_wire(),
    }
}
