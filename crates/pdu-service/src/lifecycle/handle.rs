use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tokio::sync::Notify;

use super::LifecycleError;

/// Cloneable request to end graceful serving.
///
/// Firing before the server starts waiting is not lost: the permit is kept
/// until the serve loop observes it.
#[derive(Debug, Clone, Default)]
pub struct ShutdownTrigger {
    notify: Arc<Notify>,
}

impl ShutdownTrigger {
    /// Fresh trigger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the server to stop accepting requests and drain.
    pub fn fire(&self) {
        self.notify.notify_one();
    }

    /// Resolves once [`ShutdownTrigger::fire`] has been called.
    pub async fn fired(&self) {
        self.notify.notified().await;
    }
}

type ServeThread = thread::JoinHandle<io::Result<()>>;

/// Serve thread shared by the [`ServerHandle`] and the coordinator that
/// launched it; whichever joins first reaps it.
#[derive(Clone)]
pub(crate) struct ServeWorker {
    thread: Arc<Mutex<Option<ServeThread>>>,
}

impl ServeWorker {
    pub(crate) fn new(thread: ServeThread) -> Self {
        Self {
            thread: Arc::new(Mutex::new(Some(thread))),
        }
    }

    /// Blocks until the serve thread has finished.
    ///
    /// The slot stays locked while joining, so a concurrent caller returns
    /// only after the thread is gone.
    pub(crate) fn join(&self) -> Result<(), LifecycleError> {
        let mut slot = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(thread) = slot.take() else {
            return Ok(());
        };
        match thread.join() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(LifecycleError::Serve { source }),
            Err(_) => Err(LifecycleError::ServerPanicked),
        }
    }
}

/// Handle to a server serving on a background thread.
///
/// Dropping the handle requests shutdown but does not wait for it.
pub struct ServerHandle {
    address: SocketAddr,
    trigger: ShutdownTrigger,
    worker: ServeWorker,
}

impl ServerHandle {
    pub(crate) const fn new(
        address: SocketAddr,
        trigger: ShutdownTrigger,
        worker: ServeWorker,
    ) -> Self {
        Self {
            address,
            trigger,
            worker,
        }
    }

    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Trigger that stops this server.
    #[must_use]
    pub fn trigger(&self) -> ShutdownTrigger {
        self.trigger.clone()
    }

    /// Requests graceful shutdown.
    pub fn shutdown(&self) {
        self.trigger.fire();
    }

    /// Blocks until serving ends and the marker has been cleared.
    ///
    /// Returns `Ok(())` when the coordinator's `stop` already reaped the
    /// thread.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Serve`] when serving failed and
    /// [`LifecycleError::ServerPanicked`] when the thread panicked.
    pub fn join(self) -> Result<(), LifecycleError> {
        self.worker.join()
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.trigger.fire();
    }
}
