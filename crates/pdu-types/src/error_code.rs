use std::fmt;

/// Stable integer taxonomy shared by the CLI exit codes and the HTTP
/// envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Unexpected failure without a dedicated code.
    Generic,
    /// Invalid host, port, URL prefix or other configuration value.
    Configuration,
    /// A singleton was re-parameterised after construction.
    AlreadyInitialized,
    /// The liveness marker shows a server is already running.
    AlreadyRunning,
    /// No liveness marker is present.
    NotRunning,
    /// Binding or preparing the listener failed.
    ServerStart,
    /// A remote server did not confirm shutdown in time.
    ShutdownTimeout,
    /// The remote shutdown request could not be delivered.
    ShutdownRequestFailed,
    /// Marker or settings file I/O failed.
    Storage,
    /// The manufacturer identifier is not supported.
    UnknownManufacturer,
    /// Registering or deregistering the supervisor service failed.
    ServiceRegistration,
    /// Fetching PDU metadata failed at the vendor boundary.
    FetchPduInfo,
    /// Fetching outlet metadata failed at the vendor boundary.
    FetchPortInfo,
    /// Powering an outlet on failed.
    PowerOn,
    /// Powering an outlet off failed.
    PowerOff,
    /// Power cycling an outlet failed.
    Reboot,
    /// The request body was malformed or incomplete.
    Validation,
}

impl ErrorCode {
    /// Returns the integer value reported to callers.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Generic => -1,
            Self::Configuration => 2,
            Self::AlreadyInitialized => 3,
            Self::AlreadyRunning => 4,
            Self::NotRunning => 5,
            Self::ServerStart => 6,
            Self::ShutdownTimeout => 7,
            Self::ShutdownRequestFailed => 8,
            Self::Storage => 9,
            Self::UnknownManufacturer => 10,
            Self::ServiceRegistration => 11,
            Self::FetchPduInfo => 20,
            Self::FetchPortInfo => 21,
            Self::PowerOn => 22,
            Self::PowerOff => 23,
            Self::Reboot => 24,
            Self::Validation => 40,
        }
    }

    /// Process exit status for the code. Codes outside `1..=255` collapse to 1.
    #[must_use]
    pub fn exit_status(self) -> u8 {
        u8::try_from(self.code())
            .ok()
            .filter(|status| *status != 0)
            .unwrap_or(1)
    }

    /// True when the failure was caused by the caller's input.
    #[must_use]
    pub const fn is_client_error(self) -> bool {
        matches!(self, Self::Validation)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.code())
    }
}

impl From<ErrorCode> for i32 {
    fn from(value: ErrorCode) -> Self {
        value.code()
    }
}
