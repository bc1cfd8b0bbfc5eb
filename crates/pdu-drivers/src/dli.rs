//! Digital Loggers web power switch driver, using the relay REST API.
//!
//! A switch that answers a state change with a non-success status has
//! refused the change, which is reported through the returned power state
//! rather than as an error. Transport failures are errors.

use std::time::Duration;

use once_cell::sync::OnceCell;
use pdu_types::{OutletSummary, PduInfo, PortInfo, PowerStatus};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{DriverError, Outlet, PduDriver, PduOperation, Target};

const DLI_TARGET: &str = "pdu_drivers::dli";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const OUTLETS_PATH: &str = "/restapi/relay/outlets/";

#[derive(Debug, Deserialize)]
struct RelayOutlet {
    #[serde(default)]
    name: String,
    state: bool,
}

/// Driver for DLI switches.
#[derive(Debug)]
pub struct DliDriver {
    scheme: &'static str,
    client: OnceCell<Client>,
}

impl Default for DliDriver {
    fn default() -> Self {
        Self {
            scheme: "http",
            client: OnceCell::new(),
        }
    }
}

impl DliDriver {
    /// Talks HTTPS instead of HTTP.
    #[must_use]
    pub const fn with_https(mut self) -> Self {
        self.scheme = "https";
        self
    }

    fn client(&self, operation: PduOperation) -> Result<&Client, DriverError> {
        self.client.get_or_try_init(|| {
            Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .map_err(|error| {
                    DriverError::with_source(operation, "failed to build HTTP client", error)
                })
        })
    }

    fn url(&self, target: &Target, suffix: &str) -> String {
        format!("{}://{}{OUTLETS_PATH}{suffix}", self.scheme, target.host())
    }

    fn send(
        &self,
        target: &Target,
        operation: PduOperation,
        request: impl FnOnce(&Client) -> RequestBuilder,
    ) -> Result<Response, DriverError> {
        request(self.client(operation)?)
            .basic_auth(target.username(), Some(target.password()))
            .header("Accept", "application/json")
            .header("X-CSRF", "x")
            .send()
            .map_err(|error| DriverError::with_source(operation, "request to switch failed", error))
    }

    fn read_json<T>(
        &self,
        target: &Target,
        suffix: &str,
        operation: PduOperation,
    ) -> Result<T, DriverError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = self.url(target, suffix);
        debug!(target: DLI_TARGET, %url, "reading relay state");
        self.send(target, operation, |client| client.get(&url))?
            .error_for_status()
            .and_then(Response::json)
            .map_err(|error| DriverError::with_source(operation, "unexpected switch response", error))
    }

    /// Applies a state change and returns whether the switch accepted it.
    fn change(
        &self,
        target: &Target,
        operation: PduOperation,
        request: impl FnOnce(&Client) -> RequestBuilder,
    ) -> Result<bool, DriverError> {
        let response = self.send(target, operation, request)?;
        let accepted = response.status().is_success();
        if !accepted {
            warn!(
                target: DLI_TARGET,
                host = target.host(),
                status = response.status().as_u16(),
                %operation,
                "switch refused state change"
            );
        }
        Ok(accepted)
    }

    fn set_state(
        &self,
        target: &Target,
        outlet: Outlet,
        on: bool,
        operation: PduOperation,
    ) -> Result<bool, DriverError> {
        let url = self.url(target, &format!("{}/state/", outlet.index()));
        self.change(target, operation, |client| {
            client
                .put(&url)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(format!("value={on}"))
        })
    }
}

fn power_label(on: bool) -> String {
    if on { "ON" } else { "OFF" }.to_owned()
}

impl PduDriver for DliDriver {
    fn get_pdu_info(&self, target: &Target, mut info: PduInfo) -> Result<PduInfo, DriverError> {
        let outlets: Vec<RelayOutlet> = self.read_json(target, "", PduOperation::FetchPduInfo)?;
        info.manufacturer = "DLI".to_owned();
        info.outlets = outlets
            .into_iter()
            .zip(1_u32..)
            .map(|(outlet, port_number)| OutletSummary {
                port_number,
                port_name: outlet.name,
                port_status: power_label(outlet.state),
            })
            .collect();
        Ok(info)
    }

    fn get_port_info(
        &self,
        target: &Target,
        outlet: Outlet,
        mut info: PortInfo,
    ) -> Result<PortInfo, DriverError> {
        let suffix = format!("{}/state/", outlet.index());
        let on: bool = self.read_json(target, &suffix, PduOperation::FetchPortInfo)?;
        info.state_data.available = Some(true);
        info.state_data.power_state = power_label(on);
        info.state_data.last_power_state_change_time = String::new();
        Ok(info)
    }

    fn power_on(
        &self,
        target: &Target,
        outlet: Outlet,
        mut status: PowerStatus,
    ) -> Result<PowerStatus, DriverError> {
        let accepted = self.set_state(target, outlet, true, PduOperation::PowerOn)?;
        status.power_state = power_label(accepted);
        info!(target: DLI_TARGET, host = target.host(), %outlet, accepted, "power on requested");
        Ok(status)
    }

    fn power_off(
        &self,
        target: &Target,
        outlet: Outlet,
        mut status: PowerStatus,
    ) -> Result<PowerStatus, DriverError> {
        let accepted = self.set_state(target, outlet, false, PduOperation::PowerOff)?;
        status.power_state = power_label(!accepted);
        info!(target: DLI_TARGET, host = target.host(), %outlet, accepted, "power off requested");
        Ok(status)
    }

    fn reboot(
        &self,
        target: &Target,
        outlet: Outlet,
        mut status: PowerStatus,
    ) -> Result<PowerStatus, DriverError> {
        let url = self.url(target, &format!("{}/cycle/", outlet.index()));
        let accepted = self.change(target, PduOperation::Reboot, |client| client.post(&url))?;
        status.power_state = power_label(accepted);
        info!(target: DLI_TARGET, host = target.host(), %outlet, accepted, "power cycle requested");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use pdu_types::ErrorCode;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::tests::support::FakeHttpDevice;

    #[fixture]
    fn driver() -> DliDriver {
        DliDriver::default()
    }

    fn outlet(number: i64) -> Outlet {
        Outlet::try_from(number).expect("valid outlet")
    }

    fn pending(state: &str) -> PowerStatus {
        PowerStatus {
            power_state: state.to_owned(),
            last_power_state_change_time: "2026-01-01T00:00:00Z".to_owned(),
        }
    }

    #[rstest]
    fn pdu_info_lists_relays(driver: DliDriver) {
        let device = FakeHttpDevice::spawn(
            200,
            r#"[{"name":"router","state":true},{"name":"switch","state":false}]"#,
        )
        .expect("spawn fake switch");
        let target = Target::new(device.address(), "admin", "1234");

        let info = driver
            .get_pdu_info(&target, PduInfo::default())
            .expect("pdu info");

        assert_eq!(info.manufacturer, "DLI");
        assert_eq!(info.outlets.len(), 2);
        assert_eq!(info.outlets.last().map(|o| o.port_number), Some(2));
        assert_eq!(info.outlets.first().map(|o| o.port_status.as_str()), Some("ON"));
        let request = device.take_request().expect("request recorded");
        assert!(request.starts_with("GET /restapi/relay/outlets/ HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("authorization: basic"));
    }

    #[rstest]
    fn port_info_uses_zero_based_index(driver: DliDriver) {
        let device = FakeHttpDevice::spawn(200, "false").expect("spawn fake switch");
        let target = Target::new(device.address(), "admin", "1234");

        let info = driver
            .get_port_info(&target, outlet(3), PortInfo::for_port(3))
            .expect("port info");

        assert_eq!(info.state_data.power_state, "OFF");
        assert_eq!(info.state_data.available, Some(true));
        let request = device.take_request().expect("request recorded");
        assert!(request.starts_with("GET /restapi/relay/outlets/2/state/ "));
    }

    #[rstest]
    fn power_on_puts_new_state(driver: DliDriver) {
        let device = FakeHttpDevice::spawn(204, "").expect("spawn fake switch");
        let target = Target::new(device.address(), "admin", "1234");

        let status = driver
            .power_on(&target, outlet(1), pending("ON"))
            .expect("power on");

        assert_eq!(status.power_state, "ON");
        let request = device.take_request().expect("request recorded");
        assert!(request.starts_with("PUT /restapi/relay/outlets/0/state/ "));
        assert!(request.contains("X-CSRF: x") || request.contains("x-csrf: x"));
        assert!(request.ends_with("value=true"));
    }

    #[rstest]
    fn refused_power_off_reports_outlet_still_on(driver: DliDriver) {
        let device = FakeHttpDevice::spawn(409, "").expect("spawn fake switch");
        let target = Target::new(device.address(), "admin", "1234");

        let status = driver
            .power_off(&target, outlet(2), pending("OFF"))
            .expect("refusal is not an error");

        assert_eq!(status.power_state, "ON");
    }

    #[rstest]
    fn reboot_posts_cycle(driver: DliDriver) {
        let device = FakeHttpDevice::spawn(200, "").expect("spawn fake switch");
        let target = Target::new(device.address(), "admin", "1234");

        let status = driver
            .reboot(&target, outlet(4), pending("ON"))
            .expect("reboot");

        assert_eq!(status.power_state, "ON");
        let request = device.take_request().expect("request recorded");
        assert!(request.starts_with("POST /restapi/relay/outlets/3/cycle/ "));
    }

    #[rstest]
    fn unreachable_switch_is_an_error(driver: DliDriver) {
        let target = Target::new(crate::tests::support::closed_address(), "admin", "1234");
        let error = driver
            .power_on(&target, outlet(1), pending("ON"))
            .expect_err("connection refused");
        assert_eq!(error.code(), ErrorCode::PowerOn);
    }
}
