//! The engine task.
//!
//! [`TripEngine`] owns every piece of mutable engine state: the bound trip,
//! its geofences, its navigation session, the scheduler and the request
//! tracker. It runs as a single tokio task and processes, one at a time:
//!
//! - commands from [`EngineHandle`]s,
//! - route results from gateway calls spawned under the trip's token,
//! - scheduler ticks.
//!
//! Nothing else touches this state, so location updates, ticks and route
//! results can never interleave.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::command::{Command, Reply, RouteResult};
use super::events::{EngineEvent, EngineSnapshot};
use super::handle::EngineHandle;
use super::requests::{RequestTracker, RouteTicket};
use super::trip::{ActiveTrip, TripBinding, TripGates};
use crate::config::EngineConfig;
use crate::directions::{DirectionsGateway, GatewayError, Route, RoutePurpose};
use crate::error::{EngineError, Precondition};
use crate::geo::{Coordinate, LocationSample};
use crate::geofence::{region_id, GeofenceMonitor, RegionRole};
use crate::navigation::{NavigationSession, TickOutcome};
use crate::notify::{Notification, NotificationSink};
use crate::scheduler::{Scheduler, TickKind};

/// Single-writer trip navigation engine.
pub struct TripEngine {
    config: EngineConfig,
    gateway: Arc<dyn DirectionsGateway>,
    sink: Option<Arc<dyn NotificationSink>>,

    trip: Option<ActiveTrip>,
    session: Option<NavigationSession>,
    geofences: GeofenceMonitor,
    scheduler: Scheduler,
    requests: RequestTracker,
    last_sample: Option<LocationSample>,
    pickup_preview: Option<Route>,
    destination_preview: Option<Route>,

    shutdown: CancellationToken,
    trip_token: CancellationToken,
    results_tx: mpsc::UnboundedSender<RouteResult>,
    events: broadcast::Sender<EngineEvent>,
    snapshot: watch::Sender<EngineSnapshot>,
}

impl TripEngine {
    /// Spawn an engine on the current tokio runtime.
    pub fn spawn(
        config: EngineConfig,
        gateway: Arc<dyn DirectionsGateway>,
    ) -> Result<(EngineHandle, JoinHandle<()>), EngineError> {
        Self::spawn_with_sink(config, gateway, None)
    }

    /// Spawn an engine that forwards notifications to `sink`.
    pub fn spawn_with_sink(
        config: EngineConfig,
        gateway: Arc<dyn DirectionsGateway>,
        sink: Option<Arc<dyn NotificationSink>>,
    ) -> Result<(EngineHandle, JoinHandle<()>), EngineError> {
        config.validate()?;

        let (commands_tx, commands_rx) = mpsc::channel(config.command_channel_capacity);
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_channel_capacity);
        let (snapshot, snapshot_rx) = watch::channel(EngineSnapshot::default());
        let shutdown = CancellationToken::new();

        let engine = Self {
            scheduler: Scheduler::new(
                config.route_refresh_interval,
                config.navigation_tick_interval,
            ),
            config,
            gateway,
            sink,
            trip: None,
            session: None,
            geofences: GeofenceMonitor::new(),
            requests: RequestTracker::new(),
            last_sample: None,
            pickup_preview: None,
            destination_preview: None,
            trip_token: shutdown.child_token(),
            shutdown: shutdown.clone(),
            results_tx,
            events: events.clone(),
            snapshot,
        };

        let handle = EngineHandle::new(commands_tx, events, snapshot_rx, shutdown);
        let task = tokio::spawn(engine.run(commands_rx, results_rx));
        Ok((handle, task))
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut results: mpsc::UnboundedReceiver<RouteResult>,
    ) {
        info!(gateway = self.gateway.name(), "Trip engine started");
        let shutdown = self.shutdown.clone();

        loop {
            let deadline = self.scheduler.next_deadline();

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                command = commands.recv() => {
                    let Some(command) = command else { break };
                    self.handle_command(command);
                }

                Some(result) = results.recv() => {
                    self.handle_route_result(result);
                    self.publish_snapshot();
                }

                _ = wait_until(deadline) => {
                    if let Some(kind) = self.scheduler.take_due(Instant::now()) {
                        self.handle_tick(kind);
                        self.publish_snapshot();
                    }
                }
            }
        }

        if let Some(trip_id) = self.teardown_trip() {
            debug!(trip_id = %trip_id, "Trip torn down on engine shutdown");
        }
        self.publish_snapshot();
        info!("Trip engine stopped");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_command(&mut self, command: Command) {
        debug!(command = command.name(), "Handling command");
        match command {
            Command::BindTrip { binding, reply } => {
                let result = self.bind_trip(binding);
                self.respond(reply, result);
            }
            Command::SetLocation { sample, reply } => {
                self.set_location(sample);
                self.respond(reply, Ok(()));
            }
            Command::StartNavigation { reply } => {
                let result = self.start_navigation();
                self.respond(reply, result);
            }
            Command::StopNavigation { reply } => {
                let result = self.stop_navigation();
                self.respond(reply, result);
            }
            Command::UpdateGates { gates, reply } => {
                let result = self.update_gates(gates);
                self.respond(reply, result);
            }
            Command::Cleanup { reply } => {
                self.cleanup();
                self.respond(reply, Ok(()));
            }
        }
    }

    /// Publish the new state, then answer the caller.
    fn respond(&self, reply: Reply<()>, result: Result<(), EngineError>) {
        self.publish_snapshot();
        let _ = reply.send(result);
    }

    fn bind_trip(&mut self, binding: TripBinding) -> Result<(), EngineError> {
        let trip = binding.resolve().map_err(|e| {
            warn!(trip_id = %binding.trip_id, error = %e, "Rejecting trip binding");
            EngineError::from(e)
        })?;

        let radius_m = self.config.geofence_radius_m;
        let mut geofences = GeofenceMonitor::new();
        geofences.register(region_id(RegionRole::Pickup, &trip.trip_id), trip.pickup, radius_m)?;
        geofences.register(
            region_id(RegionRole::Destination, &trip.trip_id),
            trip.destination,
            radius_m,
        )?;

        if let Some(previous) = self.teardown_trip() {
            info!(previous = %previous, trip_id = %trip.trip_id, "Replacing bound trip");
        }

        // Initial membership only; the first evaluation never transitions
        if let Some(sample) = self.last_sample {
            geofences.evaluate(&sample);
        }
        self.geofences = geofences;
        self.session = Some(NavigationSession::new(
            trip.trip_id.clone(),
            self.config.navigation_thresholds(),
        ));

        info!(
            trip_id = %trip.trip_id,
            pickup = %trip.pickup,
            destination = %trip.destination,
            "Trip bound"
        );
        self.trip = Some(trip);

        self.request_previews();
        self.scheduler.start(TickKind::RouteRefresh, Instant::now());
        Ok(())
    }

    fn set_location(&mut self, sample: LocationSample) {
        self.last_sample = Some(sample);
        self.publish(EngineEvent::SampleUpdated { sample });

        let Some(trip) = self.trip.as_ref() else {
            return;
        };

        let transitions = self.geofences.evaluate(&sample);
        let mut events = Vec::with_capacity(transitions.len());
        for transition in transitions {
            let Some(role) = RegionRole::from_region_id(&transition.region_id) else {
                continue;
            };
            let location = match role {
                RegionRole::Pickup => trip.pickup_label.clone(),
                RegionRole::Destination => trip.destination_label.clone(),
            };
            info!(
                trip_id = %trip.trip_id,
                region = %transition.region_id,
                kind = ?transition.kind,
                "Geofence transition"
            );
            events.push(EngineEvent::GeofenceTransition {
                trip_id: trip.trip_id.clone(),
                region_id: transition.region_id,
                role,
                kind: transition.kind,
                location,
            });
        }

        for event in events {
            self.publish(event);
        }
    }

    fn start_navigation(&mut self) -> Result<(), EngineError> {
        let trip = self.trip.as_ref().ok_or(Precondition::NoTripBound)?;

        if !trip.gates.pre_trip_inspection_completed {
            return Err(Precondition::PreTripInspectionIncomplete.into());
        }
        if trip.gates.vehicle_under_maintenance {
            return Err(Precondition::VehicleUnderMaintenance.into());
        }
        if !self
            .geofences
            .is_inside(&region_id(RegionRole::Pickup, &trip.trip_id))
        {
            warn!(trip_id = %trip.trip_id, "Start refused, vehicle not at pickup");
            return Err(Precondition::NotAtPickup.into());
        }

        let destination = trip.destination;
        let session = self.session.as_mut().ok_or(Precondition::NoTripBound)?;
        session.request_route()?;

        if let Some(sample) = self.last_sample {
            let ticket = self.requests.issue_replacing(RoutePurpose::Navigation);
            self.dispatch(ticket, sample.coordinate, destination);
        }
        self.scheduler.start(TickKind::Navigation, Instant::now());
        Ok(())
    }

    fn stop_navigation(&mut self) -> Result<(), EngineError> {
        let trip = self.trip.as_ref().ok_or(Precondition::NoTripBound)?;
        let trip_id = trip.trip_id.clone();
        let destination_region = region_id(RegionRole::Destination, &trip.trip_id);

        let session = self.session.as_mut().ok_or(Precondition::NoTripBound)?;
        if !session.is_navigating() {
            return Err(Precondition::NotNavigating.into());
        }
        if !self.geofences.is_inside(&destination_region) {
            warn!(trip_id = %trip_id, "Stop refused, vehicle not at destination");
            return Err(Precondition::NotAtDestination.into());
        }
        session.complete()?;

        self.scheduler.cancel_all();
        self.cancel_requests();
        self.geofences.clear();

        info!(trip_id = %trip_id, "Navigation ended");
        self.publish(EngineEvent::NavigationEnded { trip_id });
        Ok(())
    }

    fn update_gates(&mut self, gates: TripGates) -> Result<(), EngineError> {
        let trip = self.trip.as_mut().ok_or(Precondition::NoTripBound)?;
        trip.gates = gates;
        debug!(trip_id = %trip.trip_id, ?gates, "Trip gates updated");
        Ok(())
    }

    fn cleanup(&mut self) {
        let trip_id = self.teardown_trip();
        info!(trip_id = trip_id.as_deref().unwrap_or("-"), "Engine cleaned up");
        self.publish(EngineEvent::CleanedUp { trip_id });
    }

    /// Drop all trip state. Returns the id of the trip that was bound.
    fn teardown_trip(&mut self) -> Option<String> {
        self.scheduler.cancel_all();
        self.cancel_requests();
        self.geofences.clear();
        self.session = None;
        self.pickup_preview = None;
        self.destination_preview = None;
        self.trip.take().map(|trip| trip.trip_id)
    }

    /// Abort in-flight gateway calls and ignore whatever they still return.
    fn cancel_requests(&mut self) {
        self.requests.invalidate_all();
        self.trip_token.cancel();
        self.trip_token = self.shutdown.child_token();
        debug!(
            generation = self.requests.generation(),
            "In-flight route requests cancelled"
        );
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ticks
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_tick(&mut self, kind: TickKind) {
        match kind {
            TickKind::Navigation => self.navigation_tick(),
            TickKind::RouteRefresh => self.refresh_tick(),
        }
    }

    fn navigation_tick(&mut self) {
        let Some((trip_id, destination)) = self
            .trip
            .as_ref()
            .map(|t| (t.trip_id.clone(), t.destination))
        else {
            self.scheduler.cancel(TickKind::Navigation);
            return;
        };
        let Some(sample) = self.last_sample else {
            return;
        };
        let Some(session) = self.session.as_mut() else {
            self.scheduler.cancel(TickKind::Navigation);
            return;
        };

        match session.tick(&sample.coordinate) {
            TickOutcome::Inactive => {
                self.scheduler.cancel(TickKind::Navigation);
            }
            TickOutcome::AwaitingRoute => {
                if let Some(ticket) = self.requests.issue(RoutePurpose::Navigation) {
                    debug!(trip_id = %trip_id, "Retrying navigation route");
                    self.dispatch(ticket, sample.coordinate, destination);
                }
            }
            TickOutcome::RerouteRequired { .. } => {
                let ticket = self.requests.issue_replacing(RoutePurpose::Navigation);
                self.dispatch(ticket, sample.coordinate, destination);
            }
            TickOutcome::Updated { announcement, .. } => {
                let telemetry = session.telemetry(sample.timestamp);
                if let Some(text) = announcement {
                    self.publish(EngineEvent::Announcement {
                        trip_id: trip_id.clone(),
                        text,
                    });
                }
                self.publish(EngineEvent::Telemetry { trip_id, telemetry });
            }
        }
    }

    fn refresh_tick(&mut self) {
        let navigating = self.session.as_ref().is_some_and(|s| s.is_navigating());
        if !navigating {
            self.request_previews();
            return;
        }

        let (Some(trip), Some(sample)) = (self.trip.as_ref(), self.last_sample) else {
            return;
        };
        let destination = trip.destination;
        if let Some(ticket) = self.requests.issue(RoutePurpose::Navigation) {
            debug!(trip_id = %trip.trip_id, "Refreshing navigation route");
            self.dispatch(ticket, sample.coordinate, destination);
        }
    }

    /// Request the pickup preview (needs a sample) and the destination preview.
    fn request_previews(&mut self) {
        let Some(trip) = self.trip.as_ref() else {
            return;
        };
        let (pickup, destination) = (trip.pickup, trip.destination);

        if let Some(sample) = self.last_sample {
            if let Some(ticket) = self.requests.issue(RoutePurpose::PickupPreview) {
                self.dispatch(ticket, sample.coordinate, pickup);
            }
        }
        if let Some(ticket) = self.requests.issue(RoutePurpose::DestinationPreview) {
            self.dispatch(ticket, pickup, destination);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Gateway
    // ─────────────────────────────────────────────────────────────────────────

    /// Run a gateway call in its own task, cancelled with the trip.
    fn dispatch(&self, ticket: RouteTicket, origin: Coordinate, destination: Coordinate) {
        let gateway = Arc::clone(&self.gateway);
        let results = self.results_tx.clone();
        let cancel = self.trip_token.clone();

        debug!(
            purpose = %ticket.purpose,
            seq = ticket.seq,
            origin = %origin,
            destination = %destination,
            "Requesting route"
        );

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(purpose = %ticket.purpose, seq = ticket.seq, "Route request cancelled");
                }
                result = gateway.compute_route(origin, destination) => {
                    let _ = results.send(RouteResult { ticket, result });
                }
            }
        });
    }

    fn handle_route_result(&mut self, RouteResult { ticket, result }: RouteResult) {
        if !self.requests.complete(ticket) {
            debug!(purpose = %ticket.purpose, seq = ticket.seq, "Dropping stale route result");
            return;
        }
        let Some(trip_id) = self.trip.as_ref().map(|t| t.trip_id.clone()) else {
            return;
        };

        match result {
            Ok(route) => self.install_route(trip_id, ticket.purpose, route),
            Err(error) => self.route_failed(trip_id, ticket.purpose, error),
        }
    }

    fn install_route(&mut self, trip_id: String, purpose: RoutePurpose, route: Route) {
        let summary = route.summary();
        info!(
            trip_id = %trip_id,
            purpose = %purpose,
            distance_m = format!("{:.1}", summary.distance_m),
            steps = summary.step_count,
            "Route ready"
        );

        match purpose {
            RoutePurpose::PickupPreview => {
                self.pickup_preview = Some(route);
                self.publish(EngineEvent::RouteReady {
                    trip_id,
                    purpose,
                    summary,
                });
            }
            RoutePurpose::DestinationPreview => {
                self.destination_preview = Some(route);
                self.publish(EngineEvent::RouteReady {
                    trip_id,
                    purpose,
                    summary,
                });
            }
            RoutePurpose::Navigation => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                let position = self.last_sample.map(|s| s.coordinate);
                let announcement = match session.route_ready(route, position.as_ref()) {
                    Ok(announcement) => announcement,
                    Err(e) => {
                        debug!(trip_id = %trip_id, error = %e, "Ignoring navigation route");
                        return;
                    }
                };
                let at = self.last_sample.map_or_else(Utc::now, |s| s.timestamp);
                let telemetry = session.telemetry(at);

                self.publish(EngineEvent::RouteReady {
                    trip_id: trip_id.clone(),
                    purpose,
                    summary,
                });
                if let Some(text) = announcement {
                    self.publish(EngineEvent::Announcement {
                        trip_id: trip_id.clone(),
                        text,
                    });
                }
                self.publish(EngineEvent::Telemetry { trip_id, telemetry });
            }
        }
    }

    /// The previous route stays in use; the next tick retries.
    fn route_failed(&mut self, trip_id: String, purpose: RoutePurpose, error: GatewayError) {
        warn!(trip_id = %trip_id, purpose = %purpose, error = %error, "Route request failed");
        self.publish(EngineEvent::RouteFailed {
            trip_id,
            purpose,
            error,
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Publishing
    // ─────────────────────────────────────────────────────────────────────────

    fn publish(&self, event: EngineEvent) {
        if let Some(sink) = &self.sink {
            if let Some(notification) = Notification::for_event(&event) {
                sink.deliver(&notification);
            }
        }
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn publish_snapshot(&self) {
        self.snapshot.send_replace(self.build_snapshot());
    }

    fn build_snapshot(&self) -> EngineSnapshot {
        let trip_id = self.trip.as_ref().map(|t| t.trip_id.clone());
        let membership = |role| {
            trip_id
                .as_deref()
                .and_then(|id| self.geofences.membership(&region_id(role, id)))
        };
        let at = self.last_sample.map_or_else(Utc::now, |s| s.timestamp);

        EngineSnapshot {
            navigation_state: self.session.as_ref().map(|s| s.state()),
            display: self.session.as_ref().map(|s| s.display()).unwrap_or_default(),
            telemetry: self.session.as_ref().map(|s| s.telemetry(at)),
            pickup_membership: membership(RegionRole::Pickup),
            destination_membership: membership(RegionRole::Destination),
            pickup_preview: self.pickup_preview.as_ref().map(|r| r.summary()),
            destination_preview: self.destination_preview.as_ref().map(|r| r.summary()),
            active_timers: self.scheduler.active(),
            last_sample: self.last_sample,
            trip_id,
        }
    }
}

/// Sleep until `deadline`, or forever when there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => futures::future::pending::<()>().await,
    }
}
