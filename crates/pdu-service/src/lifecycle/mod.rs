//! Server lifecycle: start, stop, restart and network reconfiguration.

use std::time::Duration;

mod coordinator;
mod errors;
mod handle;
mod remote;
mod shutdown;

pub use coordinator::{LifecycleCoordinator, ServerState};
pub use errors::LifecycleError;
pub use handle::{ServerHandle, ShutdownTrigger};
pub use remote::{HttpRemoteShutdown, RemoteShutdown, RemoteShutdownError};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal, TERMINATION_SIGNALS};

#[cfg(test)]
pub(crate) use remote::MockRemoteShutdown;

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// How often `stop` re-checks the marker while waiting for shutdown.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
