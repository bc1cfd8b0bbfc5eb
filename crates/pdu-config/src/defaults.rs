use std::env;

use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Host the server binds to when no settings were stored.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Port the server binds to when no settings were stored.
pub const DEFAULT_PORT: u16 = 3586;

/// Seconds `stop` waits for a remote server to clear its marker.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 60;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Folder under the working directory that holds service state.
pub const SERVICE_DIR_NAME: &str = "RestServer";

/// Liveness marker file name.
pub const MARKER_FILE_NAME: &str = ".restserverstate";

/// Persisted network settings file name.
pub const SETTINGS_FILE_NAME: &str = "server.toml";

/// Supervisor program name used when registering the service.
pub const SUPERVISOR_PROGRAM_NAME: &str = "pdu_library_REST_SERVER";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

pub(crate) fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// The process working directory, or `.` when it is not valid UTF-8.
#[must_use]
pub fn default_working_dir() -> Utf8PathBuf {
    env::current_dir()
        .ok()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("."))
}
