use serde::{Deserialize, Serialize};

use crate::ErrorCode;

/// Response envelope returned by every HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Zero on success, otherwise the failure's [`ErrorCode`] value.
    #[serde(rename = "ErrorCode")]
    pub error_code: i32,
    /// Human-readable failure message; `null` on success.
    #[serde(rename = "Message")]
    pub message: Option<String>,
    /// Operation payload; `null` on failure.
    #[serde(rename = "Data")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Wraps a successful payload.
    pub const fn success(data: T) -> Self {
        Self {
            error_code: 0,
            message: None,
            data: Some(data),
        }
    }

    /// Builds a failure envelope without payload.
    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_code: code.code(),
            message: Some(message.into()),
            data: None,
        }
    }

    /// True when the envelope carries a success code.
    pub const fn is_success(&self) -> bool {
        self.error_code == 0
    }
}
