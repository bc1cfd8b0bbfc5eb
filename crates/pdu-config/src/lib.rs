//! Shared configuration for the PDU library service and CLI.
//!
//! Process-level options (working directory, shutdown budget, logging) are
//! layered by `ortho_config` from defaults, an optional TOML file,
//! `PDU_*` environment variables and global command-line flags. The network
//! settings operators change with `setnwcfg` and `seturlprefix` live in a
//! separate file under the working directory, see [`SettingsStore`].

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod errors;
mod logging;
mod paths;
mod prefix;
mod server;
mod settings;

pub use defaults::{
    DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_PORT, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
    MARKER_FILE_NAME, SERVICE_DIR_NAME, SETTINGS_FILE_NAME, SUPERVISOR_PROGRAM_NAME,
    default_log_filter, default_log_format, default_working_dir,
};
pub use errors::ConfigError;
pub use logging::{LogFormat, LogFormatParseError};
pub use paths::{WorkingPaths, WorkingPathsError};
pub use prefix::UrlPrefix;
pub use server::{ServerConfig, route_url};
pub use settings::{NetworkSettings, SettingsStore};

/// Layered process configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "PDU")]
pub struct Config {
    /// Directory holding the `RestServer` state folder.
    #[ortho_config(default = defaults::default_working_dir())]
    pub working_dir: Utf8PathBuf,
    /// Seconds `stop` waits for a remote server to confirm shutdown.
    #[ortho_config(default = DEFAULT_SHUTDOWN_TIMEOUT_SECS)]
    pub shutdown_timeout_secs: u64,
    /// `tracing` filter expression.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            log_filter: defaults::default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Working directory root.
    #[must_use]
    pub fn working_dir(&self) -> &Utf8PathBuf {
        &self.working_dir
    }

    /// Shutdown confirmation budget.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Rejects values `ortho_config` cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidShutdownTimeout`] when the budget is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shutdown_timeout_secs == 0 {
            return Err(ConfigError::InvalidShutdownTimeout);
        }
        Ok(())
    }
}
