//! FleetNav CLI - replay recorded tracks through the trip engine.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "fleetnav", version = fleetnav::VERSION, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a recorded track against a directions service
    Simulate {
        /// Pickup location as "lat, lon"
        #[arg(long)]
        pickup: String,

        /// Destination location as "lat, lon"
        #[arg(long)]
        destination: String,

        /// CSV file with one lat,lon[,heading] sample per line
        #[arg(long)]
        track: PathBuf,

        /// INI configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// OSRM-compatible service root, overriding the configuration
        #[arg(long)]
        osrm_url: Option<String>,

        /// Delay between samples in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Also write logs to this file
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        /// INI configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Simulate {
            pickup,
            destination,
            track,
            config,
            osrm_url,
            interval_ms,
            log_file,
        } => commands::simulate::run(SimulateArgs {
            pickup,
            destination,
            track,
            config,
            osrm_url,
            interval_ms,
            log_file,
        }),
        Commands::Config { config } => commands::config::run(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
