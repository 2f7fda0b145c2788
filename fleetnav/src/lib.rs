//! FleetNav - trip navigation and geofencing engine
//!
//! Turns a stream of vehicle location samples into arrival/departure
//! transitions for a trip's pickup and destination, a turn-by-turn
//! navigation session with automatic rerouting, and the periodic route
//! refreshes that keep displayed distances and arrival times current.
//!
//! The engine runs as one tokio task (see [`engine`]); everything else in
//! the crate is synchronous and usable on its own.

pub mod config;
pub mod directions;
pub mod engine;
pub mod error;
pub mod geo;
pub mod geofence;
pub mod logging;
pub mod navigation;
pub mod notify;
pub mod scheduler;

pub use config::{ConfigFile, EngineConfig};
pub use engine::{EngineEvent, EngineHandle, EngineSnapshot, TripBinding, TripEngine};
pub use error::{EngineError, Precondition};
pub use geo::{Coordinate, LocationSample};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
