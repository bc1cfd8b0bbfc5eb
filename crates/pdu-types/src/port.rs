use serde::{Deserialize, Serialize};

/// Outlet metadata returned by `get_port_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortInfo {
    /// One-based outlet number the request targeted.
    pub port_number: u32,
    /// Plug type of the outlet.
    pub receptacle_type: String,
    /// Current rating.
    pub current: String,
    /// Minimum voltage rating.
    pub min_voltage: String,
    /// Maximum voltage rating.
    pub max_voltage: String,
    /// Live sensor readings.
    pub sensor_data: SensorData,
    /// Switching state.
    pub state_data: StateData,
}

impl PortInfo {
    /// Empty document for `port`, the starting point for every driver.
    #[must_use]
    pub fn for_port(port: u32) -> Self {
        Self {
            port_number: port,
            receptacle_type: String::new(),
            current: String::new(),
            min_voltage: String::new(),
            max_voltage: String::new(),
            sensor_data: SensorData::default(),
            state_data: StateData::default(),
        }
    }
}

/// Sensor readings attached to an outlet. Readings the device does not
/// report are `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorData {
    /// RMS voltage.
    pub voltage: Option<f64>,
    /// RMS current.
    pub current: Option<f64>,
    /// Accumulated active energy.
    pub active_energy: Option<f64>,
    /// Line frequency.
    pub line_frequency: Option<f64>,
}

/// Switching state of an outlet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateData {
    /// Whether the outlet is available; `null` when unknown.
    pub available: Option<bool>,
    /// `ON`, `OFF` or empty when unknown.
    pub power_state: String,
    /// Timestamp of the last switch, as reported by the device.
    pub last_power_state_change_time: String,
}

/// Result of `power_on`, `power_off` and `reboot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerStatus {
    /// Power state after the operation.
    pub power_state: String,
    /// When the request was issued.
    pub last_power_state_change_time: String,
}
