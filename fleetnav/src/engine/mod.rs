//! Trip engine facade.
//!
//! Ties the geofence monitor, the navigation session, the scheduler and the
//! directions gateway together behind one single-writer task.
//!
//! # Architecture
//!
//! ```text
//! EngineHandle ──Command──► ┌──────────────────────────────┐
//!   (cloneable)             │          TripEngine          │
//!                           │                              │
//!  gateway task ──Result──► │  GeofenceMonitor             │ ──EngineEvent──► broadcast
//!       ▲                   │  NavigationSession           │ ──EngineSnapshot──► watch
//!       │                   │  Scheduler ◄── sleep_until   │ ──Notification──► sink
//!       └──── dispatch ──── │  RequestTracker              │
//!                           └──────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use fleetnav::engine::{TripBinding, TripEngine};
//!
//! let (engine, _task) = TripEngine::spawn(EngineConfig::default(), gateway)?;
//! let mut events = engine.subscribe();
//!
//! engine
//!     .bind_trip(TripBinding::new("42", "28.6139, 77.2090", "28.70, 77.10")
//!         .with_inspection_completed(true))
//!     .await?;
//! engine.set_current_location_str("28.6139, 77.2090").await?;
//! engine.start_navigation().await?;
//! ```

mod actor;
mod command;
mod events;
mod handle;
mod requests;
mod trip;

pub use actor::TripEngine;
pub use events::{EngineEvent, EngineSnapshot};
pub use handle::EngineHandle;
pub use requests::{RequestTracker, RouteTicket};
pub use trip::{TripBinding, TripGates};
