//! Routes device operations to the driver for a manufacturer.

use std::sync::Arc;

use pdu_types::{PduInfo, PortInfo, PowerStatus};
use tracing::debug;

use crate::{
    ApcDriver, AtenDriver, DispatchError, DliDriver, Manufacturer, Outlet, PduDriver,
    RaritanDriver, Target,
};

const DISPATCH_TARGET: &str = "pdu_drivers::dispatch";

/// Closed mapping from [`Manufacturer`] to driver.
///
/// The manufacturer string is parsed before any driver is touched, so an
/// unsupported vendor never causes device I/O.
#[derive(Clone)]
pub struct PduDispatcher {
    raritan: Arc<dyn PduDriver>,
    dli: Arc<dyn PduDriver>,
    apc: Arc<dyn PduDriver>,
    aten: Arc<dyn PduDriver>,
}

impl Default for PduDispatcher {
    fn default() -> Self {
        Self::standard()
    }
}

impl PduDispatcher {
    /// Dispatcher wired to the production drivers.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            raritan: Arc::new(RaritanDriver::default()),
            dli: Arc::new(DliDriver::default()),
            apc: Arc::new(ApcDriver::default()),
            aten: Arc::new(AtenDriver),
        }
    }

    /// Replaces the driver used for `manufacturer`.
    #[must_use]
    pub fn with_driver(mut self, manufacturer: Manufacturer, driver: Arc<dyn PduDriver>) -> Self {
        match manufacturer {
            Manufacturer::Raritan => self.raritan = driver,
            Manufacturer::Dli => self.dli = driver,
            Manufacturer::Apc => self.apc = driver,
            Manufacturer::Aten => self.aten = driver,
        }
        self
    }

    /// Driver registered for `manufacturer`.
    #[must_use]
    pub fn driver(&self, manufacturer: Manufacturer) -> &dyn PduDriver {
        match manufacturer {
            Manufacturer::Raritan => self.raritan.as_ref(),
            Manufacturer::Dli => self.dli.as_ref(),
            Manufacturer::Apc => self.apc.as_ref(),
            Manufacturer::Aten => self.aten.as_ref(),
        }
    }

    fn resolve(&self, manufacturer: &str) -> Result<&dyn PduDriver, DispatchError> {
        let kind: Manufacturer = manufacturer.parse()?;
        debug!(target: DISPATCH_TARGET, manufacturer = %kind, "dispatching to driver");
        Ok(self.driver(kind))
    }

    /// Reads device metadata through the manufacturer's driver.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownManufacturer`] for an unsupported
    /// vendor and [`DispatchError::Driver`] when the driver fails.
    pub fn get_pdu_info(
        &self,
        manufacturer: &str,
        target: &Target,
        info: PduInfo,
    ) -> Result<PduInfo, DispatchError> {
        Ok(self.resolve(manufacturer)?.get_pdu_info(target, info)?)
    }

    /// Reads one outlet through the manufacturer's driver.
    ///
    /// # Errors
    ///
    /// See [`PduDispatcher::get_pdu_info`].
    pub fn get_port_info(
        &self,
        manufacturer: &str,
        target: &Target,
        outlet: Outlet,
        info: PortInfo,
    ) -> Result<PortInfo, DispatchError> {
        Ok(self
            .resolve(manufacturer)?
            .get_port_info(target, outlet, info)?)
    }

    /// Switches an outlet on.
    ///
    /// # Errors
    ///
    /// See [`PduDispatcher::get_pdu_info`].
    pub fn power_on(
        &self,
        manufacturer: &str,
        target: &Target,
        outlet: Outlet,
        status: PowerStatus,
    ) -> Result<PowerStatus, DispatchError> {
        Ok(self.resolve(manufacturer)?.power_on(target, outlet, status)?)
    }

    /// Switches an outlet off.
    ///
    /// # Errors
    ///
    /// See [`PduDispatcher::get_pdu_info`].
    pub fn power_off(
        &self,
        manufacturer: &str,
        target: &Target,
        outlet: Outlet,
        status: PowerStatus,
    ) -> Result<PowerStatus, DispatchError> {
        Ok(self.resolve(manufacturer)?.power_off(target, outlet, status)?)
    }

    /// Power-cycles an outlet.
    ///
    /// # Errors
    ///
    /// See [`PduDispatcher::get_pdu_info`].
    pub fn reboot(
        &self,
        manufacturer: &str,
        target: &Target,
        outlet: Outlet,
        status: PowerStatus,
    ) -> Result<PowerStatus, DispatchError> {
        Ok(self.resolve(manufacturer)?.reboot(target, outlet, status)?)
    }
}
