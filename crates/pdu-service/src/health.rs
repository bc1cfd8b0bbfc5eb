//! Structured health reporting for server lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use pdu_config::ServerConfig;

use crate::lifecycle::LifecycleError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before the listener is bound.
    fn server_starting(&self, config: &ServerConfig, force: bool);

    /// Invoked once the listener is bound and the marker written.
    fn server_ready(&self, address: SocketAddr);

    /// Invoked when a start attempt fails.
    fn start_failed(&self, error: &LifecycleError);

    /// Invoked when a shutdown has been requested.
    fn server_stopping(&self, remote: bool);

    /// Invoked after serving ends and the marker is cleared.
    fn server_stopped(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn server_starting(&self, config: &ServerConfig, force: bool) {
        (**self).server_starting(config, force);
    }

    fn server_ready(&self, address: SocketAddr) {
        (**self).server_ready(address);
    }

    fn start_failed(&self, error: &LifecycleError) {
        (**self).start_failed(error);
    }

    fn server_stopping(&self, remote: bool) {
        (**self).server_stopping(remote);
    }

    fn server_stopped(&self) {
        (**self).server_stopped();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn server_starting(&self, config: &ServerConfig, force: bool) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_starting",
            host = config.host(),
            port = config.port(),
            url_prefix = config.url_prefix().map(ToString::to_string),
            force,
            "starting rest server"
        );
    }

    fn server_ready(&self, address: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_ready",
            %address,
            "rest server ready"
        );
    }

    fn start_failed(&self, error: &LifecycleError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "start_failed",
            code = error.code().code(),
            error = %error,
            "rest server failed to start"
        );
    }

    fn server_stopping(&self, remote: bool) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_stopping",
            remote,
            "stopping rest server"
        );
    }

    fn server_stopped(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_stopped",
            "rest server stopped"
        );
    }
}
