//! Wire types shared by the PDU library service and its clients.
//!
//! Every HTTP response uses the [`Envelope`] shape `{ErrorCode, Message,
//! Data}`. The payload types mirror the JSON documents produced by the vendor
//! drivers, using the camelCase field names existing PDU tooling expects.

mod envelope;
mod error_code;
mod pdu;
mod port;
mod request;

pub use envelope::Envelope;
pub use error_code::ErrorCode;
pub use pdu::{OutletSummary, PduInfo};
pub use port::{PortInfo, PowerStatus, SensorData, StateData};
pub use request::{PduRequestBody, PortRequestBody};
