//! Helpers shared across CLI commands.

use std::path::Path;

use fleetnav::geo::{Coordinate, LocationSample};
use fleetnav::ConfigFile;

use crate::error::CliError;

/// Load the configuration file, or defaults when none was given.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) => Ok(ConfigFile::from_ini_file(path)?),
        None => Ok(ConfigFile::default()),
    }
}

/// Read a recorded track.
pub fn read_track(path: &Path) -> Result<Vec<LocationSample>, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError::TrackRead {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_track(&text)
}

/// Parse `lat,lon[,heading]` rows.
///
/// Blank lines, `#` comments and a leading `lat,...` header are skipped.
pub fn parse_track(text: &str) -> Result<Vec<LocationSample>, CliError> {
    let mut samples = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if samples.is_empty() && line.to_ascii_lowercase().starts_with("lat") {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let (position, heading) = match fields.as_slice() {
            [lat, lon] => (format!("{}, {}", lat, lon), None),
            [lat, lon, heading] => (format!("{}, {}", lat, lon), Some(*heading)),
            _ => {
                return Err(CliError::TrackLine {
                    line: index + 1,
                    message: "expected lat,lon[,heading]".to_string(),
                })
            }
        };

        let coordinate = Coordinate::parse(&position).map_err(|e| CliError::TrackLine {
            line: index + 1,
            message: e.to_string(),
        })?;
        let mut sample = LocationSample::new(coordinate);

        if let Some(heading) = heading.filter(|h| !h.is_empty()) {
            let heading: f64 = heading.parse().map_err(|_| CliError::TrackLine {
                line: index + 1,
                message: format!("heading '{}' is not a number", heading),
            })?;
            sample = sample.with_heading(heading);
        }
        samples.push(sample);
    }

    Ok(samples)
}
