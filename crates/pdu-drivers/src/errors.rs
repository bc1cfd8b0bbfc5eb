use std::fmt;

use pdu_types::ErrorCode;
use thiserror::Error;

use crate::ManufacturerParseError;

/// Device-level operations a driver performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PduOperation {
    /// Read device metadata and outlet summaries.
    FetchPduInfo,
    /// Read one outlet's metadata, sensors and state.
    FetchPortInfo,
    /// Switch an outlet on.
    PowerOn,
    /// Switch an outlet off.
    PowerOff,
    /// Power-cycle an outlet.
    Reboot,
}

impl PduOperation {
    /// Error code reported when this operation fails.
    #[must_use]
    pub const fn error_code(self) -> ErrorCode {
        match self {
            Self::FetchPduInfo => ErrorCode::FetchPduInfo,
            Self::FetchPortInfo => ErrorCode::FetchPortInfo,
            Self::PowerOn => ErrorCode::PowerOn,
            Self::PowerOff => ErrorCode::PowerOff,
            Self::Reboot => ErrorCode::Reboot,
        }
    }
}

impl fmt::Display for PduOperation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FetchPduInfo => "get_pdu_info",
            Self::FetchPortInfo => "get_port_info",
            Self::PowerOn => "power_on",
            Self::PowerOff => "power_off",
            Self::Reboot => "reboot",
        };
        formatter.write_str(label)
    }
}

/// Error raised by a vendor driver.
#[derive(Debug, Error)]
#[error("{operation} failed: {message}")]
pub struct DriverError {
    operation: PduOperation,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DriverError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(operation: PduOperation, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source error.
    #[must_use]
    pub fn with_source(
        operation: PduOperation,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            operation,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Operation that failed.
    #[must_use]
    pub const fn operation(&self) -> PduOperation {
        self.operation
    }

    /// Human-readable failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Error code for the envelope and exit status.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.operation.error_code()
    }
}

/// Error raised by [`crate::PduDispatcher`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The manufacturer is not part of the closed vendor set.
    #[error(transparent)]
    UnknownManufacturer(#[from] ManufacturerParseError),
    /// The selected driver failed.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl DispatchError {
    /// Error code for the envelope and exit status.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownManufacturer(_) => ErrorCode::UnknownManufacturer,
            Self::Driver(error) => error.code(),
        }
    }
}
