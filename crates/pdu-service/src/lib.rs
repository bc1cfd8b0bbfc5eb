//! PDU library REST service.
//!
//! The crate wires the vendor dispatcher into an axum server and manages
//! that server's lifecycle:
//!
//! * [`registry`] hands out process-wide shared managers.
//! * [`marker`] records on disk whether a server is believed to be running.
//! * [`lifecycle`] starts, stops and reconfigures the server.
//! * [`http`] maps requests onto [`manager::PduLibraryManager`] operations.
//! * [`service`] registers the server with supervisord.

pub mod health;
pub mod http;
pub mod lifecycle;
pub mod manager;
pub mod marker;
pub mod registry;
pub mod service;
pub mod telemetry;

pub use health::{HealthReporter, StructuredHealthReporter};
pub use lifecycle::{
    LifecycleCoordinator, LifecycleError, ServerHandle, ServerState, ShutdownTrigger,
    SystemShutdownSignal,
};
pub use manager::{PduLibraryManager, library_version};
pub use marker::{LivenessMarker, MarkerError};
pub use registry::{Singleton, SingletonError, SingletonRegistry};
pub use service::{ServiceError, SupervisorService};

#[cfg(test)]
mod tests;
