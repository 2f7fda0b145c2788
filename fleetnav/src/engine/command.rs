//! Messages into the engine task.

use tokio::sync::oneshot;

use super::requests::RouteTicket;
use super::trip::{TripBinding, TripGates};
use crate::directions::{GatewayError, Route};
use crate::error::EngineError;
use crate::geo::LocationSample;

/// Reply channel for a command.
pub(crate) type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

/// Commands sent by [`EngineHandle`](super::EngineHandle).
#[derive(Debug)]
pub(crate) enum Command {
    BindTrip {
        binding: TripBinding,
        reply: Reply<()>,
    },
    SetLocation {
        sample: LocationSample,
        reply: Reply<()>,
    },
    StartNavigation {
        reply: Reply<()>,
    },
    StopNavigation {
        reply: Reply<()>,
    },
    UpdateGates {
        gates: TripGates,
        reply: Reply<()>,
    },
    Cleanup {
        reply: Reply<()>,
    },
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Command::BindTrip { .. } => "bind_trip",
            Command::SetLocation { .. } => "set_location",
            Command::StartNavigation { .. } => "start_navigation",
            Command::StopNavigation { .. } => "stop_navigation",
            Command::UpdateGates { .. } => "update_gates",
            Command::Cleanup { .. } => "cleanup",
        }
    }
}

/// A gateway result on its way back to the engine task.
#[derive(Debug)]
pub(crate) struct RouteResult {
    pub ticket: RouteTicket,
    pub result: Result<Route, GatewayError>,
}
