//! Contract every vendor driver implements.

use std::fmt;
use std::num::NonZeroU32;

use pdu_types::{PduInfo, PortInfo, PowerStatus};
use thiserror::Error;

use crate::DriverError;

/// Address and credentials of one PDU management interface.
#[derive(Clone, PartialEq, Eq)]
pub struct Target {
    host: String,
    username: String,
    password: String,
}

impl Target {
    /// Creates a target.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Management address, optionally with a port.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Login name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Login password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Target")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One-based outlet number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Outlet(NonZeroU32);

impl Outlet {
    /// Outlet number as shown on the device.
    #[must_use]
    pub const fn number(self) -> u32 {
        self.0.get()
    }

    /// Zero-based position in vendor outlet lists.
    #[must_use]
    pub fn index(self) -> usize {
        usize::try_from(self.0.get() - 1).unwrap_or(usize::MAX)
    }
}

impl fmt::Display for Outlet {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Error returned for outlet numbers below one or beyond `u32`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("port must be a positive integer, got {0}")]
pub struct InvalidOutlet(pub i64);

impl TryFrom<i64> for Outlet {
    type Error = InvalidOutlet;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self)
            .ok_or(InvalidOutlet(value))
    }
}

/// Vendor-specific protocol implementation.
///
/// Each operation receives the document the caller pre-filled and returns it
/// with whatever the device reported. Drivers are shared across request
/// threads, so they keep no per-call state.
pub trait PduDriver: Send + Sync {
    /// Reads device metadata and outlet summaries.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] tagged with
    /// [`crate::PduOperation::FetchPduInfo`].
    fn get_pdu_info(&self, target: &Target, info: PduInfo) -> Result<PduInfo, DriverError>;

    /// Reads metadata, sensors and state for one outlet.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] tagged with
    /// [`crate::PduOperation::FetchPortInfo`].
    fn get_port_info(
        &self,
        target: &Target,
        outlet: Outlet,
        info: PortInfo,
    ) -> Result<PortInfo, DriverError>;

    /// Switches an outlet on.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] tagged with [`crate::PduOperation::PowerOn`].
    fn power_on(
        &self,
        target: &Target,
        outlet: Outlet,
        status: PowerStatus,
    ) -> Result<PowerStatus, DriverError>;

    /// Switches an outlet off.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] tagged with [`crate::PduOperation::PowerOff`].
    fn power_off(
        &self,
        target: &Target,
        outlet: Outlet,
        status: PowerStatus,
    ) -> Result<PowerStatus, DriverError>;

    /// Power-cycles an outlet.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] tagged with [`crate::PduOperation::Reboot`].
    fn reboot(
        &self,
        target: &Target,
        outlet: Outlet,
        status: PowerStatus,
    ) -> Result<PowerStatus, DriverError>;
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1, 1, 0)]
    #[case(8, 8, 7)]
    fn outlet_numbers_and_indices(#[case] raw: i64, #[case] number: u32, #[case] index: usize) {
        let outlet = Outlet::try_from(raw).expect("valid outlet");
        assert_eq!(outlet.number(), number);
        assert_eq!(outlet.index(), index);
    }

    #[rstest]
    #[case(0)]
    #[case(-3)]
    #[case(i64::from(u32::MAX) + 1)]
    fn rejects_out_of_range_outlets(#[case] raw: i64) {
        assert_eq!(Outlet::try_from(raw), Err(InvalidOutlet(raw)));
    }

    #[test]
    fn debug_output_hides_password() {
        let target = Target::new("10.0.0.5", "admin", "hunter2");
        let rendered = format!("{target:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }
}
