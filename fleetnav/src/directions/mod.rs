//! Directions gateway adapter.
//!
//! Wraps the external routing provider behind one asynchronous contract:
//! `compute_route(origin, destination) -> Route | GatewayError`. The adapter
//! never retries; a failed request is surfaced to the caller, which retries
//! on its next scheduled tick.
//!
//! # Example
//!
//! ```ignore
//! use fleetnav::directions::{DirectionsGateway, OsrmConfig, OsrmGateway};
//!
//! let gateway = OsrmGateway::new(OsrmConfig::default())?;
//! let route = gateway.compute_route(origin, destination).await?;
//! println!("{} steps, {:.0} m", route.step_count(), route.distance_m());
//! ```

mod gateway;
mod osrm;
mod types;

pub use gateway::{BoxFuture, DirectionsGateway};
pub use osrm::{OsrmConfig, OsrmGateway, DEFAULT_OSRM_URL, DEFAULT_PROFILE, DEFAULT_TIMEOUT};
pub use types::{GatewayError, Route, RoutePurpose, RouteStep, RouteSummary};

#[cfg(test)]
pub use gateway::tests::MockGateway;
