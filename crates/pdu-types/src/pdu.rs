use serde::{Deserialize, Serialize};

/// Device metadata returned by `get_pdu_info`.
///
/// Drivers start from [`PduInfo::default`] and fill in whatever their
/// protocol exposes; unknown values stay as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PduInfo {
    /// Manufacturer name reported by the device.
    pub manufacturer: String,
    /// Model name.
    pub model: String,
    /// Device serial number.
    pub serial_number: String,
    /// Controller board serial number.
    pub ctrl_board_serial: String,
    /// Firmware revision.
    pub fw_revision: String,
    /// Management interface MAC address.
    pub mac_address: String,
    /// Nameplate voltage rating.
    pub voltage: String,
    /// Nameplate current rating.
    pub current: String,
    /// Nameplate frequency rating.
    pub frequency: String,
    /// Nameplate power rating.
    pub power: String,
    /// Outlets known to the device.
    pub outlets: Vec<OutletSummary>,
}

/// Short outlet description embedded in [`PduInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutletSummary {
    /// One-based outlet number.
    pub port_number: u32,
    /// Display name of the outlet.
    pub port_name: String,
    /// `ON` or `OFF`.
    pub port_status: String,
}
