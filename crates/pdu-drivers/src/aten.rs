//! Aten eco PDU driver.
//!
//! No management protocol is wired up for Aten units. Every operation
//! returns the caller's document, and `get_pdu_info` stamps the
//! manufacturer.

use pdu_types::{PduInfo, PortInfo, PowerStatus};

use crate::{DriverError, Outlet, PduDriver, Target};

/// Placeholder driver for Aten PDUs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtenDriver;

impl PduDriver for AtenDriver {
    fn get_pdu_info(&self, _target: &Target, mut info: PduInfo) -> Result<PduInfo, DriverError> {
        info.manufacturer = "Aten".to_owned();
        Ok(info)
    }

    fn get_port_info(
        &self,
        _target: &Target,
        _outlet: Outlet,
        info: PortInfo,
    ) -> Result<PortInfo, DriverError> {
        Ok(info)
    }

    fn power_on(
        &self,
        _target: &Target,
        _outlet: Outlet,
        status: PowerStatus,
    ) -> Result<PowerStatus, DriverError> {
        Ok(status)
    }

    fn power_off(
        &self,
        _target: &Target,
        _outlet: Outlet,
        status: PowerStatus,
    ) -> Result<PowerStatus, DriverError> {
        Ok(status)
    }

    fn reboot(
        &self,
        _target: &Target,
        _outlet: Outlet,
        status: PowerStatus,
    ) -> Result<PowerStatus, DriverError> {
        Ok(status)
    }
}
