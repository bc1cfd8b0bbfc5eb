use std::io;
use std::path::PathBuf;

use pdu_types::ErrorCode;
use thiserror::Error;

/// Errors raised while validating or persisting service settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The host is empty or contains whitespace.
    #[error("invalid host '{host}'")]
    InvalidHost {
        /// Rejected host value.
        host: String,
    },
    /// The port is outside `1..=65535`.
    #[error("invalid port '{port}'; expected a value between 1 and 65535")]
    InvalidPort {
        /// Rejected port text.
        port: String,
    },
    /// The URL prefix does not satisfy the path rules.
    #[error("invalid url prefix '{prefix}': {reason}")]
    InvalidUrlPrefix {
        /// Rejected prefix.
        prefix: String,
        /// Rule that was broken.
        reason: &'static str,
    },
    /// The shutdown budget was zero.
    #[error("shutdown timeout must be a positive number of seconds")]
    InvalidShutdownTimeout,
    /// Reading the settings file failed.
    #[error("failed to read settings '{path}': {source}")]
    SettingsRead {
        /// Settings file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The settings file is not valid TOML for [`crate::NetworkSettings`].
    #[error("failed to parse settings '{path}': {source}")]
    SettingsParse {
        /// Settings file path.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: toml::de::Error,
    },
    /// Encoding the settings failed.
    #[error("failed to encode settings: {source}")]
    SettingsEncode {
        /// Underlying encode error.
        #[from]
        source: toml::ser::Error,
    },
    /// Writing the settings file failed.
    #[error("failed to write settings '{path}': {source}")]
    SettingsWrite {
        /// Settings file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    /// Stable error code for the failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::SettingsRead { .. } | Self::SettingsWrite { .. } => ErrorCode::Storage,
            _ => ErrorCode::Configuration,
        }
    }
}
