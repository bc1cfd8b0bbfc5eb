//! Shared fixtures for lifecycle and HTTP tests.

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use pdu_config::{NetworkSettings, ServerConfig, SettingsStore, WorkingPaths};
use pdu_drivers::{
    DriverError, Manufacturer, Outlet, PduDispatcher, PduDriver, PduOperation, Target,
};
use pdu_types::{PduInfo, PortInfo, PowerStatus};
use tempfile::TempDir;

use crate::health::HealthReporter;
use crate::lifecycle::{LifecycleCoordinator, LifecycleError};
use crate::registry::SingletonRegistry;

pub(crate) const STOP_BUDGET: Duration = Duration::from_secs(5);
pub(crate) const SHORT_TIMEOUT: Duration = Duration::from_millis(300);
pub(crate) const FAST_POLL: Duration = Duration::from_millis(20);

/// Port that was free a moment ago.
pub(crate) fn free_port() -> u16 {
    let scratch = TcpListener::bind(("127.0.0.1", 0)).expect("bind scratch listener");
    scratch.local_addr().expect("scratch address").port()
}

/// Lifecycle events in the order they were reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HealthEvent {
    Starting { force: bool },
    Ready(SocketAddr),
    StartFailed(i32),
    Stopping { remote: bool },
    Stopped,
}

#[derive(Default)]
pub(crate) struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub(crate) fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn server_starting(&self, _config: &ServerConfig, force: bool) {
        self.record(HealthEvent::Starting { force });
    }

    fn server_ready(&self, address: SocketAddr) {
        self.record(HealthEvent::Ready(address));
    }

    fn start_failed(&self, error: &LifecycleError) {
        self.record(HealthEvent::StartFailed(error.code().code()));
    }

    fn server_stopping(&self, remote: bool) {
        self.record(HealthEvent::Stopping { remote });
    }

    fn server_stopped(&self) {
        self.record(HealthEvent::Stopped);
    }
}

/// Polls `condition` until it holds or `budget` runs out.
pub(crate) fn wait_until(budget: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + budget;
    while !condition() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(FAST_POLL);
    }
    true
}

/// Driver answering from memory, optionally failing or stalling every
/// operation.
#[derive(Default)]
pub(crate) struct StubDriver {
    failing: bool,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubDriver {
    pub(crate) fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub(crate) fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, operation: PduOperation) -> Result<(), DriverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        if self.failing {
            Err(DriverError::new(operation, "device unreachable"))
        } else {
            Ok(())
        }
    }
}

impl PduDriver for StubDriver {
    fn get_pdu_info(&self, _target: &Target, mut info: PduInfo) -> Result<PduInfo, DriverError> {
        self.check(PduOperation::FetchPduInfo)?;
        info.manufacturer = "Stub".to_owned();
        info.model = "SW-8".to_owned();
        Ok(info)
    }

    fn get_port_info(
        &self,
        _target: &Target,
        _outlet: Outlet,
        mut info: PortInfo,
    ) -> Result<PortInfo, DriverError> {
        self.check(PduOperation::FetchPortInfo)?;
        info.state_data.power_state = "ON".to_owned();
        Ok(info)
    }

    fn power_on(
        &self,
        _target: &Target,
        _outlet: Outlet,
        status: PowerStatus,
    ) -> Result<PowerStatus, DriverError> {
        self.check(PduOperation::PowerOn)?;
        Ok(status)
    }

    fn power_off(
        &self,
        _target: &Target,
        _outlet: Outlet,
        status: PowerStatus,
    ) -> Result<PowerStatus, DriverError> {
        self.check(PduOperation::PowerOff)?;
        Ok(status)
    }

    fn reboot(
        &self,
        _target: &Target,
        _outlet: Outlet,
        status: PowerStatus,
    ) -> Result<PowerStatus, DriverError> {
        self.check(PduOperation::Reboot)?;
        Ok(status)
    }
}

/// Isolated working directory, registry and stub driver for one test.
pub(crate) struct ServiceHarness {
    pub(crate) dir: TempDir,
    pub(crate) registry: Arc<SingletonRegistry>,
    pub(crate) reporter: Arc<RecordingHealthReporter>,
    pub(crate) driver: Arc<StubDriver>,
    pub(crate) port: u16,
}

impl ServiceHarness {
    pub(crate) fn new() -> Self {
        Self::with_driver(StubDriver::default())
    }

    pub(crate) fn with_driver(driver: StubDriver) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let port = free_port();
        let paths = WorkingPaths::prepare(dir.path()).expect("prepare working dir");
        let settings = NetworkSettings::parse("127.0.0.1", &port.to_string()).expect("settings");
        SettingsStore::new(paths.settings_path())
            .save(&settings)
            .expect("save settings");
        Self {
            dir,
            registry: Arc::new(SingletonRegistry::new()),
            reporter: Arc::new(RecordingHealthReporter::default()),
            driver: Arc::new(driver),
            port,
        }
    }

    pub(crate) fn paths(&self) -> WorkingPaths {
        WorkingPaths::new(self.dir.path())
    }

    /// Coordinator whose manager routes `dli` to the stub driver.
    pub(crate) fn coordinator(&self) -> LifecycleCoordinator {
        let stub: Arc<dyn PduDriver> = Arc::clone(&self.driver) as Arc<dyn PduDriver>;
        LifecycleCoordinator::new(self.paths(), STOP_BUDGET)
            .with_registry(Arc::clone(&self.registry))
            .with_reporter(Arc::clone(&self.reporter) as Arc<dyn HealthReporter>)
            .with_dispatcher(move || {
                PduDispatcher::standard().with_driver(Manufacturer::Dli, Arc::clone(&stub))
            })
            .with_poll_interval(FAST_POLL)
    }

    pub(crate) fn url(&self, route: &str) -> String {
        format!("http://127.0.0.1:{}{route}", self.port)
    }
}
