//! Termination signals that end a foreground `start`.

use std::io;
use std::os::raw::c_int;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;

/// Signals a foreground server stops on.
pub const TERMINATION_SIGNALS: [c_int; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];

/// Source of the request to stop a server started in the foreground.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until the process is asked to terminate.
    ///
    /// Returns the signal number when one was delivered, or `None` when the
    /// source closed without one.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when the listener cannot be installed.
    fn wait(&self) -> Result<Option<c_int>, ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Registering the signal handlers failed.
    #[error("failed to register handlers for signals {signals:?}: {source}")]
    Install {
        /// Signals that were requested.
        signals: Vec<c_int>,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Waits for one of a fixed set of POSIX signals.
#[derive(Debug, Clone, Copy)]
pub struct SystemShutdownSignal {
    signals: &'static [c_int],
}

impl SystemShutdownSignal {
    /// Listener for [`TERMINATION_SIGNALS`].
    #[must_use]
    pub const fn new() -> Self {
        Self::with_signals(&TERMINATION_SIGNALS)
    }

    /// Listener for `signals` instead of the default set.
    #[must_use]
    pub const fn with_signals(signals: &'static [c_int]) -> Self {
        Self { signals }
    }

    /// Signals this listener waits for.
    #[must_use]
    pub const fn signals(&self) -> &'static [c_int] {
        self.signals
    }
}

impl Default for SystemShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<Option<c_int>, ShutdownError> {
        let mut signals = Signals::new(self.signals).map_err(|source| ShutdownError::Install {
            signals: self.signals.to_vec(),
            source,
        })?;
        Ok(signals.forever().next())
    }
}
