use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// PDU vendors with a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Manufacturer {
    /// Raritan PX series, JSON-RPC over HTTPS.
    Raritan,
    /// Digital Loggers web power switches, REST over HTTP.
    Dli,
    /// APC switched rack PDUs, telnet command line.
    Apc,
    /// Aten eco PDUs.
    Aten,
}

impl Manufacturer {
    /// Every supported vendor.
    pub const ALL: [Self; 4] = [Self::Raritan, Self::Dli, Self::Apc, Self::Aten];
}

impl fmt::Display for Manufacturer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Raritan => "raritan",
            Self::Dli => "dli",
            Self::Apc => "apc",
            Self::Aten => "aten",
        };
        formatter.write_str(label)
    }
}

/// Error returned when a manufacturer identifier is not supported.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported manufacturer: {0}")]
pub struct ManufacturerParseError(String);

impl ManufacturerParseError {
    /// Creates a parse error describing the unsupported value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the offending value.
    #[must_use]
    pub fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for Manufacturer {
    type Err = ManufacturerParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "raritan" => Ok(Self::Raritan),
            "dli" => Ok(Self::Dli),
            "apc" => Ok(Self::Apc),
            "aten" => Ok(Self::Aten),
            other => Err(ManufacturerParseError::new(other)),
        }
    }
}
