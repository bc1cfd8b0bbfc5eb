//! Failures surfaced by the CLI and their exit codes.

use std::io;
use std::sync::Arc;

use pdu_config::{ConfigError, WorkingPathsError};
use pdu_service::telemetry::TelemetryError;
use pdu_service::{LifecycleError, ServiceError};
use pdu_types::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    WorkingPaths(#[from] WorkingPathsError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("failed to write command output: {0}")]
    Output(#[source] io::Error),
}

impl AppError {
    pub(crate) const fn code(&self) -> ErrorCode {
        match self {
            Self::LoadConfiguration(_) | Self::Telemetry(_) => ErrorCode::Configuration,
            Self::CliUsage(_) | Self::Output(_) => ErrorCode::Generic,
            Self::Config(error) => error.code(),
            Self::WorkingPaths(_) => ErrorCode::Storage,
            Self::Lifecycle(error) => error.code(),
            Self::Service(error) => error.code(),
        }
    }
}
