//! APC switched rack PDU driver.
//!
//! Outlet control goes through the network management card's telnet
//! command line. The card exposes no metadata over that channel, so the
//! read operations only stamp the manufacturer.

mod telnet;

use std::io;
use std::time::Duration;

use pdu_types::{PduInfo, PortInfo, PowerStatus};
use thiserror::Error;
use tracing::{debug, info};

use self::telnet::TelnetSession;
use crate::{DriverError, Outlet, PduDriver, PduOperation, Target};

const APC_TARGET: &str = "pdu_drivers::apc";
const DEFAULT_TELNET_PORT: u16 = 23;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_PROMPT: &str = "User Name :";
const PASSWORD_PROMPT: &str = "Password  :";
const READY_BANNER: &str = "Use tcpip command";
const SUCCESS: &str = "E000: Success";

#[derive(Debug, Error)]
#[error("telnet session failed during {stage}: {source}")]
struct SessionError {
    stage: &'static str,
    #[source]
    source: io::Error,
}

fn at<T>(stage: &'static str, result: io::Result<T>) -> Result<T, SessionError> {
    result.map_err(|source| SessionError { stage, source })
}

/// Driver for APC network management cards.
#[derive(Debug, Clone)]
pub struct ApcDriver {
    port: u16,
    timeout: Duration,
}

impl Default for ApcDriver {
    fn default() -> Self {
        Self {
            port: DEFAULT_TELNET_PORT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ApcDriver {
    /// Connects to a non-standard telnet port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Overrides the connect and per-prompt timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run_script(&self, target: &Target, command: &str) -> Result<(), SessionError> {
        let mut session = at(
            "connect",
            TelnetSession::connect(target.host(), self.port, self.timeout),
        )?;
        at("login prompt", session.read_until(USER_PROMPT))?;
        at("login", session.write_line(target.username()))?;
        at("password prompt", session.read_until(PASSWORD_PROMPT))?;
        at("password", session.write_line(target.password()))?;
        at("banner", session.read_until(READY_BANNER))?;
        debug!(target: APC_TARGET, host = target.host(), command, "sending outlet command");
        at("command", session.write_line(command))?;
        at("confirmation", session.read_until(SUCCESS))
    }

    fn outlet_command(
        &self,
        target: &Target,
        verb: &str,
        outlet: Outlet,
        operation: PduOperation,
    ) -> Result<(), DriverError> {
        self.run_script(target, &format!("{verb} {outlet}"))
            .map_err(|error| DriverError::with_source(operation, error.to_string(), error))?;
        info!(target: APC_TARGET, host = target.host(), %outlet, %operation, "outlet command confirmed");
        Ok(())
    }
}

impl PduDriver for ApcDriver {
    fn get_pdu_info(&self, _target: &Target, mut info: PduInfo) -> Result<PduInfo, DriverError> {
        info.manufacturer = "APC".to_owned();
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
        target: &Target,
        outlet: Outlet,
        status: PowerStatus,
    ) -> Result<PowerStatus, DriverError> {
        self.outlet_command(target, "olOn", outlet, PduOperation::PowerOn)?;
        Ok(status)
    }

    fn power_off(
        &self,
        target: &Target,
        outlet: Outlet,
        status: PowerStatus,
    ) -> Result<PowerStatus, DriverError> {
        self.outlet_command(target, "olOff", outlet, PduOperation::PowerOff)?;
        Ok(status)
    }

    fn reboot(
        &self,
        target: &Target,
        outlet: Outlet,
        status: PowerStatus,
    ) -> Result<PowerStatus, DriverError> {
        self.outlet_command(target, "olReboot", outlet, PduOperation::Reboot)?;
        Ok(status)
    }
}
