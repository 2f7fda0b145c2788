//! Simulate command - replay a recorded track through the engine.
//!
//! Binds one trip, feeds every track sample as the current location and
//! drives the trip the way a driver app would: navigation starts once the
//! vehicle reports inside the pickup region and stops once it reports inside
//! the destination region. Every published event is printed as one JSON line.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fleetnav::directions::{DirectionsGateway, OsrmGateway};
use fleetnav::logging::{init_logging, LoggingConfig};
use fleetnav::navigation::NavigationState;
use fleetnav::notify::{LogSink, NotificationSink};
use fleetnav::{EngineEvent, EngineHandle, LocationSample, TripBinding, TripEngine};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use super::common::{load_config, read_track};
use crate::error::CliError;

/// Trip id used for the simulated trip.
const SIMULATED_TRIP_ID: &str = "simulated";

/// Arguments for the simulate command.
pub struct SimulateArgs {
    pub pickup: String,
    pub destination: String,
    pub track: PathBuf,
    pub config: Option<PathBuf>,
    pub osrm_url: Option<String>,
    pub interval_ms: u64,
    pub log_file: Option<PathBuf>,
}

/// Run the simulate command.
pub fn run(args: SimulateArgs) -> Result<(), CliError> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(url) = &args.osrm_url {
        config.directions = config.directions.with_base_url(url.clone());
    }

    let mut logging = LoggingConfig::default();
    if let Some(path) = &args.log_file {
        logging = logging.with_log_file(path.clone());
    }
    let _guard = init_logging(&logging)?;

    let samples = read_track(&args.track)?;
    info!(
        samples = samples.len(),
        track = %args.track.display(),
        osrm = %config.directions.base_url,
        "Starting simulation"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    runtime.block_on(async move {
        let gateway: Arc<dyn DirectionsGateway> = Arc::new(OsrmGateway::new(config.directions)?);
        let sink: Arc<dyn NotificationSink> = Arc::new(LogSink);
        let (engine, task) = TripEngine::spawn_with_sink(config.engine, gateway, Some(sink))?;

        let printer = tokio::spawn(print_events(engine.subscribe()));

        let outcome = tokio::select! {
            result = replay(&engine, &args, samples) => result,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, cleaning up");
                Ok(())
            }
        };

        // Shut down even when the replay failed
        let _ = engine.cleanup().await;
        engine.shutdown();
        let _ = task.await;
        drop(engine);
        let _ = printer.await;

        outcome
    })
}

async fn replay(
    engine: &EngineHandle,
    args: &SimulateArgs,
    samples: Vec<LocationSample>,
) -> Result<(), CliError> {
    engine
        .bind_trip(
            TripBinding::new(SIMULATED_TRIP_ID, &args.pickup, &args.destination)
                .with_inspection_completed(true),
        )
        .await?;

    let interval = Duration::from_millis(args.interval_ms);
    let total = samples.len();

    for (index, sample) in samples.into_iter().enumerate() {
        engine.set_current_location(sample).await?;
        let snapshot = engine.snapshot();

        if snapshot.is_navigating() {
            if snapshot.at_destination() {
                engine.stop_navigation().await?;
                info!(sample = index + 1, total, "Arrived, navigation stopped");
                // Let the final events drain before cleanup
                tokio::time::sleep(interval).await;
                return Ok(());
            }
        } else if snapshot.at_pickup() && snapshot.navigation_state == Some(NavigationState::Idle) {
            match engine.start_navigation().await {
                Ok(()) => info!(sample = index + 1, total, "Navigation started"),
                Err(e) => warn!(sample = index + 1, error = %e, "Start refused"),
            }
        }

        tokio::time::sleep(interval).await;
    }

    warn!(total, "Track ended before reaching the destination");
    Ok(())
}

async fn print_events(mut events: tokio::sync::broadcast::Receiver<EngineEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!(event = event.name(), error = %e, "Cannot serialize event"),
            },
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event printer lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}
