//! Request body validation performed before any driver is consulted.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use pdu_drivers::{Outlet, Target};
use pdu_types::{ErrorCode, PduRequestBody, PortRequestBody};
use thiserror::Error;

/// Client-side input errors, reported with HTTP 400.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The body was missing or not valid JSON for the operation.
    #[error("malformed request body: {0}")]
    Malformed(String),
    /// A mandatory field was missing or blank.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    /// The outlet number was below one.
    #[error("port must be a positive integer, got {0}")]
    InvalidPort(i64),
}

impl ValidationError {
    /// Error code for the envelope.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::Validation
    }
}

/// Device addressing extracted from a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequest {
    /// Manufacturer identifier as supplied; parsed by the dispatcher.
    pub manufacturer: String,
    /// Management endpoint and credentials.
    pub target: Target,
}

/// Device addressing plus an outlet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRequest {
    /// Device addressing.
    pub device: DeviceRequest,
    /// Validated outlet.
    pub outlet: Outlet,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    value
        .filter(|text| !text.trim().is_empty())
        .ok_or(ValidationError::MissingField(field))
}

fn accept<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ValidationError> {
    body.map(|Json(inner)| inner)
        .map_err(|rejection| ValidationError::Malformed(rejection.body_text()))
}

/// Validates a device-scoped body.
///
/// # Errors
///
/// Returns [`ValidationError`] for a malformed body or a blank field.
pub fn device_request(
    body: Result<Json<PduRequestBody>, JsonRejection>,
) -> Result<DeviceRequest, ValidationError> {
    device_fields(accept(body)?)
}

/// Validates an outlet-scoped body.
///
/// # Errors
///
/// Returns [`ValidationError`] for a malformed body, a blank field or a port
/// below one.
pub fn port_request(
    body: Result<Json<PortRequestBody>, JsonRejection>,
) -> Result<PortRequest, ValidationError> {
    let PortRequestBody { target, port } = accept(body)?;
    let device = device_fields(target)?;
    let number = port.ok_or(ValidationError::MissingField("port"))?;
    let outlet = Outlet::try_from(number).map_err(|_| ValidationError::InvalidPort(number))?;
    Ok(PortRequest { device, outlet })
}

fn device_fields(body: PduRequestBody) -> Result<DeviceRequest, ValidationError> {
    Ok(DeviceRequest {
        manufacturer: required(body.manufacturer, "manufacturer")?,
        target: Target::new(
            required(body.ip, "ip")?,
            required(body.username, "username")?,
            required(body.password, "password")?,
        ),
    })
}
