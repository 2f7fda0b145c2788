//! Config command - show the effective configuration.

use std::path::PathBuf;

use super::common::load_config;
use crate::error::CliError;

/// Print the configuration as INI, defaults filled in.
pub fn run(path: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(path.as_deref())?;

    match &path {
        Some(path) => println!("; Effective configuration from {}", path.display()),
        None => println!("; Default configuration"),
    }
    print!("{}", config.to_ini_string()?);

    Ok(())
}
