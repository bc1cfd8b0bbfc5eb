use serde::{Deserialize, Serialize};

/// Body accepted by device-scoped operations.
///
/// Fields are optional on the wire so the server can report every missing
/// value as a validation failure instead of a generic decode error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PduRequestBody {
    /// Manufacturer identifier (`raritan`, `dli`, `apc`, `aten`).
    pub manufacturer: Option<String>,
    /// Address of the PDU management interface.
    pub ip: Option<String>,
    /// Login name.
    pub username: Option<String>,
    /// Login password.
    pub password: Option<String>,
}

/// Body accepted by outlet-scoped operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRequestBody {
    /// Device addressing and credentials.
    #[serde(flatten)]
    pub target: PduRequestBody,
    /// One-based outlet number.
    pub port: Option<i64>,
}
