//! Directions gateway abstraction.

use std::future::Future;
use std::pin::Pin;

use super::types::{GatewayError, Route};
use crate::geo::Coordinate;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Asynchronous route computation against an external provider.
///
/// Implementations perform exactly one provider call per invocation and
/// never retry; callers decide when to try again.
pub trait DirectionsGateway: Send + Sync + 'static {
    /// Compute a route from `origin` to `destination`.
    fn compute_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> BoxFuture<'_, Result<Route, GatewayError>>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}
