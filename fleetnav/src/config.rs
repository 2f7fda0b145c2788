//! Engine configuration.
//!
//! [`EngineConfig`] holds every tunable of the engine with defaults taken
//! from the module constants. A [`ConfigFile`] adds the directions provider
//! settings and reads/writes both from an INI file:
//!
//! ```ini
//! [geofence]
//! radius_m = 100
//!
//! [navigation]
//! reroute_threshold_m = 50
//! advance_threshold_m = 20
//! announcement_threshold_m = 200
//!
//! [scheduler]
//! route_refresh_secs = 30
//! navigation_tick_ms = 1000
//!
//! [engine]
//! command_channel_capacity = 64
//! event_channel_capacity = 256
//!
//! [directions]
//! base_url = https://router.project-osrm.org
//! profile = driving
//! timeout_secs = 10
//! ```
//!
//! Missing sections and keys keep their defaults.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::directions::OsrmConfig;
use crate::geofence::DEFAULT_RADIUS_M;
use crate::navigation::{
    NavigationThresholds, DEFAULT_ADVANCE_THRESHOLD_M, DEFAULT_ANNOUNCEMENT_THRESHOLD_M,
    DEFAULT_REROUTE_THRESHOLD_M,
};
use crate::scheduler::{DEFAULT_NAVIGATION_TICK_INTERVAL, DEFAULT_ROUTE_REFRESH_INTERVAL};

/// Default capacity of the command channel.
pub const DEFAULT_COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Default capacity of the event broadcast channel.
///
/// Subscribers that fall further behind than this lose the oldest events.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value '{value}' for [{section}] {key}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    #[error("Invalid configuration: {field} {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to write config: {0}")]
    Write(String),
}

/// Tunables of the trip engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Radius of the pickup and destination regions.
    pub geofence_radius_m: f64,
    /// Off-route distance that triggers a reroute.
    pub reroute_threshold_m: f64,
    /// Distance at which a step's start point counts as reached.
    pub advance_threshold_m: f64,
    /// Distance at which a maneuver is announced.
    pub announcement_threshold_m: f64,
    /// Route refresh cadence.
    pub route_refresh_interval: Duration,
    /// Navigation tick cadence.
    pub navigation_tick_interval: Duration,
    /// Bounded command queue size.
    pub command_channel_capacity: usize,
    /// Event broadcast buffer size.
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            geofence_radius_m: DEFAULT_RADIUS_M,
            reroute_threshold_m: DEFAULT_REROUTE_THRESHOLD_M,
            advance_threshold_m: DEFAULT_ADVANCE_THRESHOLD_M,
            announcement_threshold_m: DEFAULT_ANNOUNCEMENT_THRESHOLD_M,
            route_refresh_interval: DEFAULT_ROUTE_REFRESH_INTERVAL,
            navigation_tick_interval: DEFAULT_NAVIGATION_TICK_INTERVAL,
            command_channel_capacity: DEFAULT_COMMAND_CHANNEL_CAPACITY,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_geofence_radius_m(mut self, radius_m: f64) -> Self {
        self.geofence_radius_m = radius_m;
        self
    }

    pub fn with_reroute_threshold_m(mut self, meters: f64) -> Self {
        self.reroute_threshold_m = meters;
        self
    }

    pub fn with_advance_threshold_m(mut self, meters: f64) -> Self {
        self.advance_threshold_m = meters;
        self
    }

    pub fn with_announcement_threshold_m(mut self, meters: f64) -> Self {
        self.announcement_threshold_m = meters;
        self
    }

    pub fn with_route_refresh_interval(mut self, interval: Duration) -> Self {
        self.route_refresh_interval = interval;
        self
    }

    pub fn with_navigation_tick_interval(mut self, interval: Duration) -> Self {
        self.navigation_tick_interval = interval;
        self
    }

    pub fn with_command_channel_capacity(mut self, capacity: usize) -> Self {
        self.command_channel_capacity = capacity;
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// Thresholds handed to each navigation session.
    pub fn navigation_thresholds(&self) -> NavigationThresholds {
        NavigationThresholds {
            reroute_m: self.reroute_threshold_m,
            advance_m: self.advance_threshold_m,
            announcement_m: self.announcement_threshold_m,
        }
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let distances = [
            ("geofence_radius_m", self.geofence_radius_m),
            ("reroute_threshold_m", self.reroute_threshold_m),
            ("advance_threshold_m", self.advance_threshold_m),
            ("announcement_threshold_m", self.announcement_threshold_m),
        ];
        for (field, value) in distances {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be a positive distance, got {}", value),
                });
            }
        }

        let intervals = [
            ("route_refresh_interval", self.route_refresh_interval),
            ("navigation_tick_interval", self.navigation_tick_interval),
        ];
        for (field, value) in intervals {
            if value.is_zero() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        let capacities = [
            ("command_channel_capacity", self.command_channel_capacity),
            ("event_channel_capacity", self.event_channel_capacity),
        ];
        for (field, value) in capacities {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Load the engine section of an INI file.
    pub fn from_ini_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        ConfigFile::from_ini_file(path).map(|file| file.engine)
    }

    /// Parse the engine section of INI text.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        ConfigFile::from_ini_str(text).map(|file| file.engine)
    }
}

/// Everything an INI config file can hold.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub engine: EngineConfig,
    pub directions: OsrmConfig,
}

impl ConfigFile {
    /// Load and validate an INI file.
    pub fn from_ini_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let file = Self::from_ini(&ini)?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(file)
    }

    /// Parse and validate INI text.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut engine = EngineConfig::default();
        let mut directions = OsrmConfig::default();

        if let Some(v) = read::<f64>(ini, "geofence", "radius_m")? {
            engine.geofence_radius_m = v;
        }
        if let Some(v) = read::<f64>(ini, "navigation", "reroute_threshold_m")? {
            engine.reroute_threshold_m = v;
        }
        if let Some(v) = read::<f64>(ini, "navigation", "advance_threshold_m")? {
            engine.advance_threshold_m = v;
        }
        if let Some(v) = read::<f64>(ini, "navigation", "announcement_threshold_m")? {
            engine.announcement_threshold_m = v;
        }
        if let Some(v) = read::<u64>(ini, "scheduler", "route_refresh_secs")? {
            engine.route_refresh_interval = Duration::from_secs(v);
        }
        if let Some(v) = read::<u64>(ini, "scheduler", "navigation_tick_ms")? {
            engine.navigation_tick_interval = Duration::from_millis(v);
        }
        if let Some(v) = read::<usize>(ini, "engine", "command_channel_capacity")? {
            engine.command_channel_capacity = v;
        }
        if let Some(v) = read::<usize>(ini, "engine", "event_channel_capacity")? {
            engine.event_channel_capacity = v;
        }

        if let Some(v) = read::<String>(ini, "directions", "base_url")? {
            directions = directions.with_base_url(v);
        }
        if let Some(v) = read::<String>(ini, "directions", "profile")? {
            directions = directions.with_profile(v);
        }
        if let Some(v) = read::<u64>(ini, "directions", "timeout_secs")? {
            directions = directions.with_timeout(Duration::from_secs(v));
        }

        engine.validate()?;
        Ok(Self { engine, directions })
    }

    /// Render as INI text.
    pub fn to_ini_string(&self) -> Result<String, ConfigError> {
        let e = &self.engine;
        let mut ini = Ini::new();
        ini.with_section(Some("geofence"))
            .set("radius_m", e.geofence_radius_m.to_string());
        ini.with_section(Some("navigation"))
            .set("reroute_threshold_m", e.reroute_threshold_m.to_string())
            .set("advance_threshold_m", e.advance_threshold_m.to_string())
            .set(
                "announcement_threshold_m",
                e.announcement_threshold_m.to_string(),
            );
        ini.with_section(Some("scheduler"))
            .set(
                "route_refresh_secs",
                e.route_refresh_interval.as_secs().to_string(),
            )
            .set(
                "navigation_tick_ms",
                e.navigation_tick_interval.as_millis().to_string(),
            );
        ini.with_section(Some("engine"))
            .set(
                "command_channel_capacity",
                e.command_channel_capacity.to_string(),
            )
            .set("event_channel_capacity", e.event_channel_capacity.to_string());
        ini.with_section(Some("directions"))
            .set("base_url", self.directions.base_url.clone())
            .set("profile", self.directions.profile.clone())
            .set(
                "timeout_secs",
                self.directions.timeout.as_secs().to_string(),
            );

        let mut buf = Vec::new();
        ini.write_to(&mut buf)
            .map_err(|e| ConfigError::Write(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| ConfigError::Write(e.to_string()))
    }
}

/// Read and parse an optional key.
fn read<T: FromStr>(ini: &Ini, section: &str, key: &str) -> Result<Option<T>, ConfigError> {
    let Some(raw) = ini.section(Some(section)).and_then(|s| s.get(key)) else {
        return Ok(None);
    };
    let raw = raw.trim();
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.geofence_radius_m, 100.0);
        assert_eq!(config.route_refresh_interval, Duration::from_secs(30));
        assert_eq!(config.navigation_tick_interval, Duration::from_secs(1));
        assert_eq!(config.navigation_thresholds(), NavigationThresholds::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let err = EngineConfig::default()
            .with_reroute_threshold_m(0.0)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "reroute_threshold_m",
                ..
            }
        ));

        assert!(EngineConfig::default()
            .with_navigation_tick_interval(Duration::ZERO)
            .validate()
            .is_err());
        assert!(EngineConfig::default()
            .with_event_channel_capacity(0)
            .validate()
            .is_err());
        assert!(EngineConfig::default()
            .with_geofence_radius_m(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_ini_str_partial() {
        let config = EngineConfig::from_ini_str(
            "[navigation]\nreroute_threshold_m = 75\n\n[scheduler]\nnavigation_tick_ms = 500\n",
        )
        .unwrap();

        assert_eq!(config.reroute_threshold_m, 75.0);
        assert_eq!(config.navigation_tick_interval, Duration::from_millis(500));
        assert_eq!(config.advance_threshold_m, 20.0);
        assert_eq!(config.geofence_radius_m, 100.0);
    }

    #[test]
    fn test_from_ini_str_invalid_value() {
        let err = EngineConfig::from_ini_str("[geofence]\nradius_m = wide\n").unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                section: "geofence".into(),
                key: "radius_m".into(),
                value: "wide".into(),
            }
        );
    }

    #[test]
    fn test_from_ini_str_fails_validation() {
        let err = EngineConfig::from_ini_str("[geofence]\nradius_m = -1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_directions_section() {
        let file = ConfigFile::from_ini_str(
            "[directions]\nbase_url = http://localhost:5000/\nprofile = car\ntimeout_secs = 3\n",
        )
        .unwrap();
        assert_eq!(file.directions.base_url, "http://localhost:5000");
        assert_eq!(file.directions.profile, "car");
        assert_eq!(file.directions.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_ini_file_roundtrip() {
        let original = ConfigFile {
            engine: EngineConfig::default()
                .with_geofence_radius_m(150.0)
                .with_route_refresh_interval(Duration::from_secs(45)),
            directions: OsrmConfig::default().with_profile("car"),
        };

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(original.to_ini_string().unwrap().as_bytes())
            .unwrap();

        let loaded = ConfigFile::from_ini_file(file.path()).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigFile::from_ini_file("/nonexistent/fleetnav.ini").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
