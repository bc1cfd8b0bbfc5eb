//! Unified error surface for starting, stopping and reconfiguring the server.

use std::convert::Infallible;
use std::io;
use std::time::Duration;

use pdu_config::{ConfigError, WorkingPathsError};
use pdu_types::ErrorCode;
use thiserror::Error;

use crate::marker::MarkerError;
use crate::registry::SingletonError;

use super::remote::RemoteShutdownError;
use super::shutdown::ShutdownError;

/// Errors surfaced by [`super::LifecycleCoordinator`].
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Host, port, prefix or timeout failed validation, or settings I/O
    /// failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The working directory could not be prepared.
    #[error(transparent)]
    WorkingPaths(#[from] WorkingPathsError),
    /// The marker shows a server is already running.
    #[error("rest server is already running (marker '{marker}')")]
    AlreadyRunning {
        /// Marker path.
        marker: String,
    },
    /// No marker is present.
    #[error("rest server is not running")]
    NotRunning,
    /// The shared manager could not be obtained.
    #[error("failed to obtain pdu library manager: {source}")]
    Manager {
        /// Registry error.
        #[source]
        source: SingletonError<Infallible>,
    },
    /// The listen address could not be resolved or bound.
    #[error("failed to bind rest server to {address}: {source}")]
    Bind {
        /// Address that could not be bound.
        address: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The async runtime or server thread could not be created.
    #[error("failed to prepare rest server runtime: {source}")]
    Runtime {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the marker after binding failed.
    #[error("failed to record rest server as running: {source}")]
    MarkPresent {
        /// Marker error.
        #[source]
        source: MarkerError,
    },
    /// Serving ended with an IO error.
    #[error("rest server stopped with an error: {source}")]
    Serve {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The server thread panicked.
    #[error("rest server thread panicked")]
    ServerPanicked,
    /// Clearing the marker failed.
    #[error(transparent)]
    Marker(#[from] MarkerError),
    /// The shutdown request could not be delivered.
    #[error("failed to request rest server shutdown: {source}")]
    ShutdownRequest {
        /// Transport error.
        #[source]
        source: RemoteShutdownError,
    },
    /// The server did not clear its marker in time.
    #[error("rest server did not confirm shutdown within {}s", timeout.as_secs())]
    ShutdownTimeout {
        /// Budget that elapsed.
        timeout: Duration,
    },
    /// Installing signal handlers failed.
    #[error(transparent)]
    Signal(#[from] ShutdownError),
}

impl LifecycleError {
    /// Error code for the envelope and exit status.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Config(error) => error.code(),
            Self::WorkingPaths(_) | Self::Marker(_) => ErrorCode::Storage,
            Self::AlreadyRunning { .. } => ErrorCode::AlreadyRunning,
            Self::NotRunning => ErrorCode::NotRunning,
            Self::Manager { .. }
            | Self::Bind { .. }
            | Self::Runtime { .. }
            | Self::MarkPresent { .. } => ErrorCode::ServerStart,
            Self::ShutdownRequest { .. } => ErrorCode::ShutdownRequestFailed,
            Self::ShutdownTimeout { .. } => ErrorCode::ShutdownTimeout,
            Self::Serve { .. } | Self::ServerPanicked | Self::Signal(_) => ErrorCode::Generic,
        }
    }
}
