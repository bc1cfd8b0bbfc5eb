//! Raritan PX driver.
//!
//! The controller exposes its object model over JSON-RPC. The PDU lives at
//! `/model/pdu/0`; outlets, sensors and readings are further resources whose
//! ids (`rid`) are discovered through the PDU object.

mod rpc;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pdu_types::{OutletSummary, PduInfo, PortInfo, PowerStatus};
use serde_json::{Value, json};
use tracing::{debug, info};

pub use rpc::{HttpsRpcTransport, RpcError, RpcTransport};

use crate::{DriverError, Outlet, PduDriver, PduOperation, Target};

const PDU_RID: &str = "/model/pdu/0";
const RARITAN_TARGET: &str = "pdu_drivers::raritan";
const DEFAULT_REBOOT_PAUSE: Duration = Duration::from_secs(2);
const POWER_OFF: i64 = 0;
const POWER_ON: i64 = 1;

/// Driver speaking the PX JSON-RPC API.
pub struct RaritanDriver {
    transport: Arc<dyn RpcTransport>,
    reboot_pause: Duration,
}

impl Default for RaritanDriver {
    fn default() -> Self {
        Self::with_transport(Arc::new(HttpsRpcTransport::default()))
    }
}

impl RaritanDriver {
    /// Driver using `transport` for every call.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            transport,
            reboot_pause: DEFAULT_REBOOT_PAUSE,
        }
    }

    /// Overrides the delay between switching off and on during a reboot.
    #[must_use]
    pub const fn with_reboot_pause(mut self, pause: Duration) -> Self {
        self.reboot_pause = pause;
        self
    }

    fn invoke(
        &self,
        target: &Target,
        rid: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, RpcError> {
        let result = self.transport.call(target, rid, method, params)?;
        Ok(unwrap_ret(result))
    }

    fn outlet_rids(&self, target: &Target) -> Result<Vec<String>, RpcError> {
        let outlets = self.invoke(target, PDU_RID, "getOutlets", json!({}))?;
        Ok(outlets
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry.get("rid").and_then(Value::as_str))
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn outlet_rid(
        &self,
        target: &Target,
        outlet: Outlet,
        operation: PduOperation,
    ) -> Result<String, DriverError> {
        let rids = self
            .outlet_rids(target)
            .map_err(|error| DriverError::with_source(operation, "failed to list outlets", error))?;
        rids.into_iter().nth(outlet.index()).ok_or_else(|| {
            DriverError::new(operation, format!("outlet {outlet} is not present on the PDU"))
        })
    }

    fn read_sensor(
        &self,
        target: &Target,
        sensors: &Value,
        name: &str,
    ) -> Result<Option<f64>, RpcError> {
        let Some(rid) = sensors
            .get(name)
            .and_then(|sensor| sensor.get("rid"))
            .and_then(Value::as_str)
        else {
            return Ok(None);
        };
        let reading = self.invoke(target, rid, "getReading", json!({}))?;
        Ok(reading.get("value").and_then(Value::as_f64))
    }

    fn set_power_state(
        &self,
        target: &Target,
        rid: &str,
        pstate: i64,
        operation: PduOperation,
    ) -> Result<(), DriverError> {
        let outcome = self
            .invoke(target, rid, "setPowerState", json!({ "pstate": pstate }))
            .map_err(|error| DriverError::with_source(operation, "setPowerState failed", error))?;
        match outcome.as_i64() {
            None | Some(0) => Ok(()),
            Some(code) => Err(DriverError::new(
                operation,
                format!("setPowerState returned status {code}"),
            )),
        }
    }

    fn read_pdu_info(&self, target: &Target, mut info: PduInfo) -> Result<PduInfo, RpcError> {
        let meta = self.invoke(target, PDU_RID, "getMetaData", json!({}))?;
        info.manufacturer = text(&meta, "/nameplate/manufacturer");
        info.model = text(&meta, "/nameplate/model");
        info.serial_number = text(&meta, "/nameplate/serialNumber");
        info.ctrl_board_serial = text(&meta, "/ctrlBoardSerial");
        info.fw_revision = text(&meta, "/fwRevision");
        info.mac_address = text(&meta, "/macAddress");
        info.voltage = text(&meta, "/nameplate/rating/voltage");
        info.current = text(&meta, "/nameplate/rating/current");
        info.frequency = text(&meta, "/nameplate/rating/frequency");
        info.power = text(&meta, "/nameplate/rating/power");

        for (position, rid) in self.outlet_rids(target)?.iter().enumerate() {
            let outlet_meta = self.invoke(target, rid, "getMetaData", json!({}))?;
            let settings = self.invoke(target, rid, "getSettings", json!({}))?;
            let state = self.invoke(target, rid, "getState", json!({}))?;
            let label = text(&outlet_meta, "/label");
            let port_number = label
                .parse::<u32>()
                .ok()
                .or_else(|| u32::try_from(position + 1).ok())
                .unwrap_or_default();
            let name = text(&settings, "/name");
            info.outlets.push(OutletSummary {
                port_number,
                port_name: if name.is_empty() {
                    format!("Outlet {label}")
                } else {
                    name
                },
                port_status: power_label(state.get("powerState")),
            });
        }
        Ok(info)
    }

    fn read_port_info(
        &self,
        target: &Target,
        rid: &str,
        mut info: PortInfo,
    ) -> Result<PortInfo, RpcError> {
        let meta = self.invoke(target, rid, "getMetaData", json!({}))?;
        info.receptacle_type = text(&meta, "/receptacleType");
        info.current = text(&meta, "/rating/current");
        info.min_voltage = text(&meta, "/rating/minVoltage");
        info.max_voltage = text(&meta, "/rating/maxVoltage");

        let sensors = self.invoke(target, rid, "getSensors", json!({}))?;
        info.sensor_data.voltage = self.read_sensor(target, &sensors, "voltage")?;
        info.sensor_data.current = self.read_sensor(target, &sensors, "current")?;
        info.sensor_data.active_energy = self.read_sensor(target, &sensors, "activeEnergy")?;
        info.sensor_data.line_frequency = self.read_sensor(target, &sensors, "lineFrequency")?;

        let state = self.invoke(target, rid, "getState", json!({}))?;
        info.state_data.available = state.get("available").and_then(Value::as_bool);
        info.state_data.power_state = power_label(state.get("powerState"));
        info.state_data.last_power_state_change_time = text(&state, "/lastPowerStateChange");
        Ok(info)
    }
}

impl PduDriver for RaritanDriver {
    fn get_pdu_info(&self, target: &Target, info: PduInfo) -> Result<PduInfo, DriverError> {
        debug!(target: RARITAN_TARGET, host = target.host(), "reading pdu info");
        self.read_pdu_info(target, info).map_err(|error| {
            DriverError::with_source(PduOperation::FetchPduInfo, "failed to read PDU", error)
        })
    }

    fn get_port_info(
        &self,
        target: &Target,
        outlet: Outlet,
        info: PortInfo,
    ) -> Result<PortInfo, DriverError> {
        let rid = self.outlet_rid(target, outlet, PduOperation::FetchPortInfo)?;
        self.read_port_info(target, &rid, info).map_err(|error| {
            DriverError::with_source(PduOperation::FetchPortInfo, "failed to read outlet", error)
        })
    }

    fn power_on(
        &self,
        target: &Target,
        outlet: Outlet,
        status: PowerStatus,
    ) -> Result<PowerStatus, DriverError> {
        let rid = self.outlet_rid(target, outlet, PduOperation::PowerOn)?;
        self.set_power_state(target, &rid, POWER_ON, PduOperation::PowerOn)?;
        info!(target: RARITAN_TARGET, host = target.host(), %outlet, "outlet switched on");
        Ok(status)
    }

    fn power_off(
        &self,
        target: &Target,
        outlet: Outlet,
        status: PowerStatus,
    ) -> Result<PowerStatus, DriverError> {
        let rid = self.outlet_rid(target, outlet, PduOperation::PowerOff)?;
        self.set_power_state(target, &rid, POWER_OFF, PduOperation::PowerOff)?;
        info!(target: RARITAN_TARGET, host = target.host(), %outlet, "outlet switched off");
        Ok(status)
    }

    fn reboot(
        &self,
        target: &Target,
        outlet: Outlet,
        status: PowerStatus,
    ) -> Result<PowerStatus, DriverError> {
        let rid = self.outlet_rid(target, outlet, PduOperation::Reboot)?;
        self.set_power_state(target, &rid, POWER_OFF, PduOperation::Reboot)?;
        thread::sleep(self.reboot_pause);
        self.set_power_state(target, &rid, POWER_ON, PduOperation::Reboot)?;
        info!(target: RARITAN_TARGET, host = target.host(), %outlet, "outlet power-cycled");
        Ok(status)
    }
}

/// Raritan wraps return values in `{"_ret_": ...}`.
fn unwrap_ret(result: Value) -> Value {
    match result {
        Value::Object(mut members) => match members.remove("_ret_") {
            Some(inner) => inner,
            None => Value::Object(members),
        },
        other => other,
    }
}

fn text(value: &Value, pointer: &str) -> String {
    match value.pointer(pointer) {
        Some(Value::String(raw)) => raw.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

fn power_label(state: Option<&Value>) -> String {
    match state.and_then(Value::as_i64) {
        Some(POWER_ON) => "ON".to_owned(),
        Some(POWER_OFF) => "OFF".to_owned(),
        _ => String::new(),
    }
}
