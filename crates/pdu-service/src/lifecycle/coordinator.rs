//! Start, stop and reconfiguration of the REST server.
//!
//! The coordinator is shared between the process that serves and separate
//! CLI invocations that only want to stop or inspect it. The liveness marker
//! is the only state both sides can see, so every decision here starts from
//! whether the marker exists. The marker also carries the base URL of the
//! running server; stop and spec lookups prefer it over persisted settings,
//! which only apply on the next start.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use axum::Router;
use pdu_config::{
    Config, NetworkSettings, ServerConfig, SettingsStore, UrlPrefix, WorkingPaths, route_url,
};
use pdu_drivers::PduDispatcher;
use tokio::runtime::{self, Runtime};
use tracing::{info, warn};
use url::Url;

use super::handle::{ServeWorker, ServerHandle, ShutdownTrigger};
use super::remote::{HttpRemoteShutdown, RemoteShutdown};
use super::shutdown::ShutdownSignal;
use super::{DEFAULT_POLL_INTERVAL, LIFECYCLE_TARGET, LifecycleError};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::http::{self, AppState, SHUTDOWN_ROUTE, SPEC_ROUTE};
use crate::manager::PduLibraryManager;
use crate::marker::LivenessMarker;
use crate::registry::SingletonRegistry;

const SERVER_THREAD_NAME: &str = "pdu-rest-server";
const BLOCKING_DRAIN: Duration = Duration::from_secs(5);

type DispatcherFactory = Arc<dyn Fn() -> PduDispatcher + Send + Sync>;

/// Lifecycle as seen by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerState {
    /// Nothing is being served by this coordinator.
    #[default]
    Stopped,
    /// A start is binding the listener.
    Starting,
    /// The listener is serving.
    Running,
    /// A stop is waiting for confirmation.
    Stopping,
}

/// Coordinates the REST server lifecycle around the liveness marker.
pub struct LifecycleCoordinator {
    registry: Arc<SingletonRegistry>,
    paths: WorkingPaths,
    settings: SettingsStore,
    marker: LivenessMarker,
    shutdown_timeout: Duration,
    poll_interval: Duration,
    reporter: Arc<dyn HealthReporter>,
    remote: Arc<dyn RemoteShutdown>,
    dispatcher: DispatcherFactory,
    signal: Option<Arc<dyn ShutdownSignal>>,
    local: Mutex<Option<LocalServer>>,
    state: Arc<Mutex<ServerState>>,
}

/// Server launched by this coordinator.
struct LocalServer {
    trigger: ShutdownTrigger,
    worker: ServeWorker,
}

impl LifecycleCoordinator {
    /// Coordinator for the layout at `paths` using production collaborators.
    #[must_use]
    pub fn new(paths: WorkingPaths, shutdown_timeout: Duration) -> Self {
        Self {
            registry: SingletonRegistry::global(),
            settings: SettingsStore::new(paths.settings_path()),
            marker: LivenessMarker::from_paths(&paths),
            paths,
            shutdown_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
            reporter: Arc::new(StructuredHealthReporter::new()),
            remote: Arc::new(HttpRemoteShutdown),
            dispatcher: Arc::new(PduDispatcher::standard),
            signal: None,
            local: Mutex::new(None),
            state: Arc::new(Mutex::new(ServerState::Stopped)),
        }
    }

    /// Builds a coordinator from layered configuration, preparing the
    /// working directory.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Config`] for an invalid configuration and
    /// [`LifecycleError::WorkingPaths`] when the folder cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, LifecycleError> {
        config.validate()?;
        let paths = WorkingPaths::from_config(config)?;
        Ok(Self::new(paths, config.shutdown_timeout()))
    }

    /// Uses `registry` instead of the process-wide one.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<SingletonRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Routes lifecycle events to `reporter`.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn HealthReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Delivers remote shutdown requests through `remote`.
    #[must_use]
    pub fn with_remote_shutdown(mut self, remote: Arc<dyn RemoteShutdown>) -> Self {
        self.remote = remote;
        self
    }

    /// Builds the manager's dispatcher with `factory` on first use.
    #[must_use]
    pub fn with_dispatcher<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> PduDispatcher + Send + Sync + 'static,
    {
        self.dispatcher = Arc::new(factory);
        self
    }

    /// Also ends [`LifecycleCoordinator::start`] when `signal` fires.
    #[must_use]
    pub fn with_shutdown_signal(mut self, signal: Arc<dyn ShutdownSignal>) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Overrides the shutdown budget.
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Overrides how often `stop` re-checks the marker.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Working directory layout.
    #[must_use]
    pub const fn paths(&self) -> &WorkingPaths {
        &self.paths
    }

    /// Liveness marker.
    #[must_use]
    pub const fn marker(&self) -> &LivenessMarker {
        &self.marker
    }

    /// Current lifecycle state of this process.
    #[must_use]
    pub fn state(&self) -> ServerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace_state(&self, next: ServerState) -> ServerState {
        let mut current = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, next)
    }

    /// Effective server configuration from persisted settings.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Config`] when settings cannot be read or
    /// fail validation.
    pub fn server_config(&self) -> Result<ServerConfig, LifecycleError> {
        Ok(ServerConfig::new(self.settings.load()?, self.shutdown_timeout)?)
    }

    /// Starts serving and blocks until the server shuts down.
    ///
    /// # Errors
    ///
    /// See [`LifecycleCoordinator::launch`]; also returns
    /// [`LifecycleError::Serve`] when serving ends abnormally.
    pub fn start(&self, force: bool) -> Result<(), LifecycleError> {
        let handle = self.launch(force)?;
        if let Some(signal) = &self.signal {
            if let Err(error) = watch_signal(Arc::clone(signal), handle.trigger()) {
                handle.shutdown();
                handle.join()?;
                return Err(error);
            }
        }
        info!(target: LIFECYCLE_TARGET, address = %handle.local_addr(), "serving until shutdown");
        let outcome = handle.join();
        self.take_local();
        outcome
    }

    /// Binds, records the marker and serves on a background thread.
    ///
    /// # Errors
    ///
    /// * [`LifecycleError::AlreadyRunning`] when the marker exists and
    ///   `force` is false; the marker is left untouched.
    /// * A start error ([`LifecycleError::Bind`], [`LifecycleError::Runtime`],
    ///   [`LifecycleError::MarkPresent`], [`LifecycleError::Manager`]) when
    ///   any step fails. A bind failure leaves any existing marker alone; a
    ///   marker written by this call is removed again.
    pub fn launch(&self, force: bool) -> Result<ServerHandle, LifecycleError> {
        self.replace_state(ServerState::Starting);
        match self.launch_inner(force) {
            Ok(handle) => {
                self.replace_state(ServerState::Running);
                self.reporter.server_ready(handle.local_addr());
                Ok(handle)
            }
            Err(error) => {
                self.replace_state(ServerState::Stopped);
                self.reporter.start_failed(&error);
                Err(error)
            }
        }
    }

    fn launch_inner(&self, force: bool) -> Result<ServerHandle, LifecycleError> {
        let config = self.server_config()?;
        let base_url = config.local_url()?;
        self.reporter.server_starting(&config, force);
        self.manager()?;

        let stale = self.marker.is_present();
        if stale && !force {
            return Err(LifecycleError::AlreadyRunning {
                marker: self.marker.path().display().to_string(),
            });
        }
        if stale {
            warn!(
                target: LIFECYCLE_TARGET,
                marker = %self.marker.path().display(),
                "forcing start over an existing marker"
            );
        }

        let listener = bind_tcp(config.host(), config.port())?;
        let address = listener
            .local_addr()
            .and_then(|bound| listener.set_nonblocking(true).map(|()| bound))
            .map_err(|source| LifecycleError::Bind {
                address: format!("{}:{}", config.host(), config.port()),
                source,
            })?;
        let runtime = runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name(SERVER_THREAD_NAME)
            .build()
            .map_err(|source| LifecycleError::Runtime { source })?;
        let trigger = ShutdownTrigger::new();
        let app = http::router(AppState::new(
            Arc::clone(&self.registry),
            trigger.clone(),
            config.url_prefix().cloned(),
        ));

        self.marker
            .mark_serving(&base_url)
            .map_err(|source| LifecycleError::MarkPresent { source })?;

        let session = ServingSession {
            runtime,
            listener,
            app,
            trigger: trigger.clone(),
            marker: self.marker.clone(),
            reporter: Arc::clone(&self.reporter),
            state: Arc::clone(&self.state),
        };
        let spawned = thread::Builder::new()
            .name(SERVER_THREAD_NAME.to_owned())
            .spawn(move || session.serve());
        let worker = match spawned {
            Ok(thread) => ServeWorker::new(thread),
            Err(source) => {
                self.clear_marker_quietly();
                return Err(LifecycleError::Runtime { source });
            }
        };

        *self.local.lock().unwrap_or_else(PoisonError::into_inner) = Some(LocalServer {
            trigger: trigger.clone(),
            worker: worker.clone(),
        });
        Ok(ServerHandle::new(address, trigger, worker))
    }

    fn manager(&self) -> Result<Arc<PduLibraryManager>, LifecycleError> {
        let args = (!self.registry.is_registered::<PduLibraryManager>())
            .then(|| (self.dispatcher)());
        self.registry
            .get_instance::<PduLibraryManager>(args)
            .map_err(|source| LifecycleError::Manager { source })
    }

    fn take_local(&self) -> Option<LocalServer> {
        self.local
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Stops the running server, in this process or another one.
    ///
    /// A server launched by this coordinator is stopped directly: the call
    /// returns once its serve thread has finished and the marker is gone.
    /// Otherwise a shutdown request is posted to the URL recorded in the
    /// marker and the marker is polled within the shutdown budget.
    ///
    /// With `ignore_stop_failure`, an absent marker is a no-op, and failed or
    /// unconfirmed remote shutdowns are logged and the marker removed.
    ///
    /// # Errors
    ///
    /// * [`LifecycleError::NotRunning`] when no marker exists.
    /// * [`LifecycleError::ShutdownRequest`] when the request cannot be
    ///   delivered.
    /// * [`LifecycleError::ShutdownTimeout`] when the marker outlives the
    ///   shutdown budget.
    pub fn stop(&self, ignore_stop_failure: bool) -> Result<(), LifecycleError> {
        if !self.marker.is_present() {
            if ignore_stop_failure {
                info!(target: LIFECYCLE_TARGET, "no running rest server; nothing to stop");
                return Ok(());
            }
            return Err(LifecycleError::NotRunning);
        }
        let previous = self.replace_state(ServerState::Stopping);
        let outcome = self.request_stop(ignore_stop_failure);
        self.replace_state(if outcome.is_ok() {
            ServerState::Stopped
        } else {
            previous
        });
        outcome
    }

    fn request_stop(&self, ignore_stop_failure: bool) -> Result<(), LifecycleError> {
        self.take_local().map_or_else(
            || self.stop_remote(ignore_stop_failure),
            |local| self.stop_local(&local),
        )
    }

    fn stop_local(&self, local: &LocalServer) -> Result<(), LifecycleError> {
        self.reporter.server_stopping(false);
        local.trigger.fire();
        if let Err(error) = local.worker.join() {
            warn!(target: LIFECYCLE_TARGET, %error, "rest server ended abnormally");
        }
        self.force_clear()?;
        info!(target: LIFECYCLE_TARGET, "rest server shutdown complete");
        Ok(())
    }

    fn stop_remote(&self, ignore_stop_failure: bool) -> Result<(), LifecycleError> {
        self.reporter.server_stopping(true);
        let url = self.running_endpoint(SHUTDOWN_ROUTE)?;
        if let Err(source) = self.remote.request_shutdown(&url) {
            if ignore_stop_failure {
                warn!(
                    target: LIFECYCLE_TARGET,
                    error = %source,
                    "ignoring failed shutdown request"
                );
                return self.force_clear();
            }
            return Err(LifecycleError::ShutdownRequest { source });
        }
        info!(target: LIFECYCLE_TARGET, %url, "posted shutdown request");

        if self.await_marker_cleared() {
            info!(target: LIFECYCLE_TARGET, "rest server shutdown complete");
            return Ok(());
        }
        if ignore_stop_failure {
            warn!(
                target: LIFECYCLE_TARGET,
                timeout_secs = self.shutdown_timeout.as_secs(),
                "ignoring unconfirmed shutdown"
            );
            return self.force_clear();
        }
        Err(LifecycleError::ShutdownTimeout {
            timeout: self.shutdown_timeout,
        })
    }

    fn await_marker_cleared(&self) -> bool {
        let deadline = Instant::now() + self.shutdown_timeout;
        loop {
            if !self.marker.is_present() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            thread::sleep(self.poll_interval.min(remaining));
        }
    }

    /// URL of `route` on the running server, from the marker when it names
    /// one and from persisted settings otherwise.
    fn running_endpoint(&self, route: &str) -> Result<Url, LifecycleError> {
        self.marker.serving_url().map_or_else(
            || -> Result<Url, LifecycleError> { Ok(self.server_config()?.endpoint(route)?) },
            |base| Ok(route_url(&base, route)),
        )
    }

    fn force_clear(&self) -> Result<(), LifecycleError> {
        self.marker.clear()?;
        Ok(())
    }

    fn clear_marker_quietly(&self) {
        if let Err(error) = self.marker.clear() {
            warn!(target: LIFECYCLE_TARGET, %error, "failed to remove marker after start failure");
        }
    }

    /// Stops whatever is running, ignoring failures, then starts with force.
    ///
    /// The two steps are not atomic: another process may start a server in
    /// between, in which case the start fails at bind.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`LifecycleCoordinator::start`].
    pub fn restart(&self) -> Result<(), LifecycleError> {
        self.stop(true)?;
        self.start(true)
    }

    /// Persisted host, port and prefix.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Config`] when the settings cannot be read.
    pub fn network_config(&self) -> Result<NetworkSettings, LifecycleError> {
        Ok(self.settings.load()?)
    }

    /// Persists a new host and port, keeping the prefix. Applies on the next
    /// start.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Config`] for invalid input or storage
    /// failure.
    pub fn set_network_config(
        &self,
        host: &str,
        port: &str,
    ) -> Result<NetworkSettings, LifecycleError> {
        let mut updated = NetworkSettings::parse(host, port)?;
        updated.url_prefix = self.settings.load()?.url_prefix;
        self.settings.save(&updated)?;
        info!(
            target: LIFECYCLE_TARGET,
            host = %updated.host,
            port = updated.port,
            "network configuration updated"
        );
        Ok(updated)
    }

    /// Persisted URL prefix.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Config`] when the settings cannot be read.
    pub fn url_prefix(&self) -> Result<Option<UrlPrefix>, LifecycleError> {
        Ok(self.settings.load()?.url_prefix)
    }

    /// Validates and persists a URL prefix. An empty value or `/` removes it.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Config`] for an invalid prefix or storage
    /// failure.
    pub fn set_url_prefix(&self, raw: &str) -> Result<Option<UrlPrefix>, LifecycleError> {
        let prefix = UrlPrefix::parse(raw)?;
        let mut settings = self.settings.load()?;
        settings.url_prefix.clone_from(&prefix);
        self.settings.save(&settings)?;
        info!(
            target: LIFECYCLE_TARGET,
            url_prefix = prefix.as_ref().map(ToString::to_string),
            "url prefix updated"
        );
        Ok(prefix)
    }

    /// URL of the API description of the running server.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotRunning`] without a marker and
    /// [`LifecycleError::Config`] when the URL cannot be formed.
    ///
    /// The URL points at the server as launched, even after
    /// [`LifecycleCoordinator::set_network_config`].
    pub fn show_api_spec(&self) -> Result<Url, LifecycleError> {
        if !self.marker.is_present() {
            return Err(LifecycleError::NotRunning);
        }
        self.running_endpoint(SPEC_ROUTE)
    }
}

/// Everything the server thread owns while serving.
struct ServingSession {
    runtime: Runtime,
    listener: TcpListener,
    app: Router,
    trigger: ShutdownTrigger,
    marker: LivenessMarker,
    reporter: Arc<dyn HealthReporter>,
    state: Arc<Mutex<ServerState>>,
}

impl ServingSession {
    fn serve(self) -> io::Result<()> {
        let Self {
            runtime,
            listener,
            app,
            trigger,
            marker,
            reporter,
            state,
        } = self;
        let outcome = runtime.block_on(async move {
            let bound = tokio::net::TcpListener::from_std(listener)?;
            axum::serve(bound, app)
                .with_graceful_shutdown(async move { trigger.fired().await })
                .await
        });
        runtime.shutdown_timeout(BLOCKING_DRAIN);

        if let Err(error) = marker.clear() {
            warn!(target: LIFECYCLE_TARGET, %error, "failed to remove marker after serving");
        }
        *state.lock().unwrap_or_else(PoisonError::into_inner) = ServerState::Stopped;
        reporter.server_stopped();
        outcome
    }
}

fn watch_signal(
    signal: Arc<dyn ShutdownSignal>,
    trigger: ShutdownTrigger,
) -> Result<(), LifecycleError> {
    thread::Builder::new()
        .name("pdu-signal-watch".to_owned())
        .spawn(move || match signal.wait() {
            Ok(received) => {
                info!(target: LIFECYCLE_TARGET, signal = received, "shutdown signal received");
                trigger.fire();
            }
            Err(error) => {
                warn!(target: LIFECYCLE_TARGET, %error, "signal watcher unavailable");
            }
        })
        .map(|_| ())
        .map_err(|source| LifecycleError::Runtime { source })
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, LifecycleError> {
    let address = format!("{host}:{port}");
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| LifecycleError::Bind {
            address: address.clone(),
            source,
        })?;
    let addr = addrs
        .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
        .ok_or_else(|| LifecycleError::Bind {
            address: address.clone(),
            source: io::Error::new(io::ErrorKind::AddrNotAvailable, "host resolved to no addresses"),
        })?;
    TcpListener::bind(addr).map_err(|source| LifecycleError::Bind { address, source })
}
