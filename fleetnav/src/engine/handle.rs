//! Client side of the engine.

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use super::command::{Command, Reply};
use super::events::{EngineEvent, EngineSnapshot};
use super::trip::{TripBinding, TripGates};
use crate::error::EngineError;
use crate::geo::{Coordinate, LocationSample};

/// Cloneable handle for commanding and observing a running engine.
///
/// Every command is answered after the engine has applied it and published
/// the resulting snapshot, so [`EngineHandle::snapshot`] called right after
/// an awaited command reflects that command.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<EngineEvent>,
    snapshot: watch::Receiver<EngineSnapshot>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("running", &self.is_running())
            .finish()
    }
}

impl EngineHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        events: broadcast::Sender<EngineEvent>,
        snapshot: watch::Receiver<EngineSnapshot>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            commands,
            events,
            snapshot,
            shutdown,
        }
    }

    async fn request(
        &self,
        make: impl FnOnce(Reply<()>) -> Command,
    ) -> Result<(), EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| EngineError::EngineStopped)?;
        response.await.map_err(|_| EngineError::EngineStopped)?
    }

    /// Make `binding` the active trip.
    ///
    /// Both coordinates are validated first; an invalid one rejects the
    /// whole binding and leaves the previous trip untouched. Otherwise the
    /// previous trip is torn down, pickup and destination regions are
    /// registered and preview routes are requested.
    pub async fn bind_trip(&self, binding: TripBinding) -> Result<(), EngineError> {
        self.request(|reply| Command::BindTrip { binding, reply })
            .await
    }

    /// Feed the latest location sample.
    pub async fn set_current_location(&self, sample: LocationSample) -> Result<(), EngineError> {
        self.request(|reply| Command::SetLocation { sample, reply })
            .await
    }

    /// Feed a location given as `"lat, lon"`.
    pub async fn set_current_location_str(&self, input: &str) -> Result<(), EngineError> {
        let coordinate = Coordinate::parse(input)?;
        self.set_current_location(LocationSample::new(coordinate))
            .await
    }

    /// Start navigating to the destination.
    ///
    /// Refused unless a trip is bound, the pre-trip inspection is done, the
    /// vehicle is not under maintenance and the vehicle is inside the
    /// pickup region.
    pub async fn start_navigation(&self) -> Result<(), EngineError> {
        self.request(|reply| Command::StartNavigation { reply })
            .await
    }

    /// Stop navigation. Refused unless the vehicle is inside the destination
    /// region.
    pub async fn stop_navigation(&self) -> Result<(), EngineError> {
        self.request(|reply| Command::StopNavigation { reply })
            .await
    }

    /// Replace the inspection and maintenance flags of the bound trip.
    pub async fn update_trip_gates(&self, gates: TripGates) -> Result<(), EngineError> {
        self.request(|reply| Command::UpdateGates { gates, reply })
            .await
    }

    /// Tear down the bound trip. Safe to call any number of times.
    pub async fn cleanup(&self) -> Result<(), EngineError> {
        self.request(|reply| Command::Cleanup { reply }).await
    }

    /// Latest published state.
    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every snapshot change.
    pub fn watch(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshot.clone()
    }

    /// Subscribe to engine events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Ask the engine task to stop.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Whether the engine task is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}
