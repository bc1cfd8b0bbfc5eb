//! JSON-RPC 2.0 transport for Raritan PX controllers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::Target;

const RPC_TARGET: &str = "pdu_drivers::raritan";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised by a Raritan RPC call.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Building the HTTP client failed.
    #[error("failed to build HTTPS client: {0}")]
    Client(#[source] reqwest::Error),
    /// The request could not be sent or the response could not be decoded.
    #[error("request to '{url}' failed: {source}")]
    Http {
        /// Endpoint that was called.
        url: String,
        /// Underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },
    /// The controller answered with a JSON-RPC error object.
    #[error("controller rejected '{method}' with code {code}: {message}")]
    Remote {
        /// Method that failed.
        method: String,
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },
    /// The response carried neither `result` nor `error`.
    #[error("controller response to '{method}' had no result")]
    MissingResult {
        /// Method that was called.
        method: String,
    },
}

/// Sends one JSON-RPC call to a resource on a controller.
#[cfg_attr(test, mockall::automock)]
pub trait RpcTransport: Send + Sync {
    /// Invokes `method` on resource `rid` and returns the `result` member.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] on transport failure or a remote error.
    fn call(&self, target: &Target, rid: &str, method: &str, params: Value)
    -> Result<Value, RpcError>;
}

/// HTTPS transport with basic authentication.
///
/// PX controllers ship with self-signed certificates, so certificate
/// validation is disabled.
#[derive(Debug, Default)]
pub struct HttpsRpcTransport {
    client: OnceCell<Client>,
    next_id: AtomicU64,
}

impl HttpsRpcTransport {
    fn client(&self) -> Result<&Client, RpcError> {
        self.client.get_or_try_init(|| {
            Client::builder()
                .danger_accept_invalid_certs(true)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .map_err(RpcError::Client)
        })
    }
}

impl RpcTransport for HttpsRpcTransport {
    fn call(
        &self,
        target: &Target,
        rid: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, RpcError> {
        let url = format!("https://{}{rid}", target.host());
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(target: RPC_TARGET, %url, method, id, "sending json-rpc call");
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        let response: Value = self
            .client()?
            .post(&url)
            .basic_auth(target.username(), Some(target.password()))
            .json(&body)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::json)
            .map_err(|source| RpcError::Http {
                url: url.clone(),
                source,
            })?;
        into_result(method, response)
    }
}

fn into_result(method: &str, response: Value) -> Result<Value, RpcError> {
    let Value::Object(mut members) = response else {
        return Err(RpcError::MissingResult {
            method: method.to_owned(),
        });
    };
    if let Some(error) = members.remove("error") {
        return Err(RpcError::Remote {
            method: method.to_owned(),
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
        });
    }
    members.remove("result").ok_or_else(|| RpcError::MissingResult {
        method: method.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_result_member() {
        let value = into_result("getState", json!({"jsonrpc": "2.0", "result": {"_ret_": 1}}))
            .expect("result present");
        assert_eq!(value, json!({"_ret_": 1}));
    }

    #[test]
    fn surfaces_remote_errors() {
        let error = into_result(
            "setPowerState",
            json!({"error": {"code": -32601, "message": "method not found"}}),
        )
        .expect_err("remote error");
        assert!(matches!(error, RpcError::Remote { code: -32601, .. }));
    }

    #[test]
    fn missing_result_is_an_error() {
        let error = into_result("getOutlets", json!({"id": 3})).expect_err("no result");
        assert!(matches!(error, RpcError::MissingResult { .. }));
    }
}
