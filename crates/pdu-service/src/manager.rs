//! Shared façade over the driver dispatcher.

use std::convert::Infallible;

use pdu_drivers::{DispatchError, Outlet, PduDispatcher, Target};
use pdu_types::{PduInfo, PortInfo, PowerStatus};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

use crate::registry::Singleton;

const MANAGER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::manager");

/// Registry-owned entry point for every PDU operation.
///
/// The manager builds each operation's default document before handing it to
/// the dispatcher, so drivers that cannot report a field leave it empty
/// rather than absent.
pub struct PduLibraryManager {
    dispatcher: PduDispatcher,
}

impl Singleton for PduLibraryManager {
    type Args = PduDispatcher;
    type Error = Infallible;
    const IGNORE_SUBSEQUENT_ARGS: bool = true;

    fn construct(dispatcher: PduDispatcher) -> Result<Self, Infallible> {
        Ok(Self { dispatcher })
    }

    fn prepare_to_forget(&self) {
        info!(target: MANAGER_TARGET, "releasing pdu library manager");
    }
}

impl PduLibraryManager {
    /// Library name and version.
    #[must_use]
    pub fn get_version(&self) -> String {
        let version = library_version();
        info!(target: MANAGER_TARGET, %version, "reporting library version");
        version
    }

    /// Reads device metadata.
    ///
    /// # Errors
    ///
    /// Propagates [`DispatchError`].
    pub fn get_pdu_info(&self, manufacturer: &str, target: &Target) -> Result<PduInfo, DispatchError> {
        info!(target: MANAGER_TARGET, host = target.host(), manufacturer, "reading pdu metadata");
        self.dispatcher
            .get_pdu_info(manufacturer, target, PduInfo::default())
    }

    /// Reads one outlet.
    ///
    /// # Errors
    ///
    /// Propagates [`DispatchError`].
    pub fn get_port_info(
        &self,
        manufacturer: &str,
        target: &Target,
        outlet: Outlet,
    ) -> Result<PortInfo, DispatchError> {
        info!(target: MANAGER_TARGET, host = target.host(), manufacturer, %outlet, "reading outlet metadata");
        self.dispatcher.get_port_info(
            manufacturer,
            target,
            outlet,
            PortInfo::for_port(outlet.number()),
        )
    }

    /// Switches an outlet on.
    ///
    /// # Errors
    ///
    /// Propagates [`DispatchError`].
    pub fn power_on(
        &self,
        manufacturer: &str,
        target: &Target,
        outlet: Outlet,
    ) -> Result<PowerStatus, DispatchError> {
        info!(target: MANAGER_TARGET, host = target.host(), manufacturer, %outlet, "powering outlet on");
        self.dispatcher
            .power_on(manufacturer, target, outlet, requested("ON"))
    }

    /// Switches an outlet off.
    ///
    /// # Errors
    ///
    /// Propagates [`DispatchError`].
    pub fn power_off(
        &self,
        manufacturer: &str,
        target: &Target,
        outlet: Outlet,
    ) -> Result<PowerStatus, DispatchError> {
        info!(target: MANAGER_TARGET, host = target.host(), manufacturer, %outlet, "powering outlet off");
        self.dispatcher
            .power_off(manufacturer, target, outlet, requested("OFF"))
    }

    /// Power-cycles an outlet.
    ///
    /// # Errors
    ///
    /// Propagates [`DispatchError`].
    pub fn reboot(
        &self,
        manufacturer: &str,
        target: &Target,
        outlet: Outlet,
    ) -> Result<PowerStatus, DispatchError> {
        info!(target: MANAGER_TARGET, host = target.host(), manufacturer, %outlet, "rebooting outlet");
        self.dispatcher
            .reboot(manufacturer, target, outlet, requested("ON"))
    }
}

/// `PduLibrary:<version>` for this build.
#[must_use]
pub fn library_version() -> String {
    format!("PduLibrary:{}", env!("CARGO_PKG_VERSION"))
}

/// Status document describing a change requested now.
fn requested(power_state: &str) -> PowerStatus {
    PowerStatus {
        power_state: power_state.to_owned(),
        last_power_state_change_time: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
    }
}
