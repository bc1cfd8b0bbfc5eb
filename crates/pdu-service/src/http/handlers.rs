use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use pdu_drivers::{DispatchError, Outlet, Target};
use pdu_types::{Envelope, ErrorCode, PduInfo, PduRequestBody, PortInfo, PortRequestBody, PowerStatus};
use serde::Serialize;
use serde_json::Value;
use tokio::task::{self, JoinError};
use tracing::{info, warn};

use super::{AppState, HTTP_TARGET, openapi, validation};
use crate::manager::PduLibraryManager;
use crate::registry::{SingletonError, SingletonRegistry};

/// Status plus enveloped body.
pub(super) type ApiResponse<T> = (StatusCode, Json<Envelope<T>>);

type PortOperation<T> =
    fn(&PduLibraryManager, &str, &Target, Outlet) -> Result<T, DispatchError>;

#[derive(Debug)]
pub(super) struct ApiError {
    code: ErrorCode,
    message: String,
}

impl From<validation::ValidationError> for ApiError {
    fn from(error: validation::ValidationError) -> Self {
        Self {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(error: DispatchError) -> Self {
        Self {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

impl From<SingletonError<Infallible>> for ApiError {
    fn from(error: SingletonError<Infallible>) -> Self {
        Self {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

impl From<JoinError> for ApiError {
    fn from(error: JoinError) -> Self {
        Self {
            code: ErrorCode::Generic,
            message: format!("request worker failed: {error}"),
        }
    }
}

/// Payload of `/v1/get_version`.
#[derive(Debug, Serialize)]
pub(super) struct VersionData {
    version: String,
}

fn reply<T>(result: Result<T, ApiError>) -> ApiResponse<T> {
    match result {
        Ok(data) => (StatusCode::OK, Json(Envelope::success(data))),
        Err(ApiError { code, message }) => {
            let status = if code.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            warn!(target: HTTP_TARGET, code = code.code(), %message, "request failed");
            (status, Json(Envelope::failure(code, message)))
        }
    }
}

/// Looks the manager up and runs `operation` on the blocking pool.
async fn on_blocking<T, F>(registry: Arc<SingletonRegistry>, operation: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&PduLibraryManager) -> Result<T, DispatchError> + Send + 'static,
{
    task::spawn_blocking(move || {
        let manager = registry.get_instance::<PduLibraryManager>(None)?;
        operation(&manager).map_err(ApiError::from)
    })
    .await?
}

async fn port_operation<T>(
    state: AppState,
    body: Result<Json<PortRequestBody>, JsonRejection>,
    operation: PortOperation<T>,
) -> ApiResponse<T>
where
    T: Send + 'static,
{
    let outcome = async {
        let request = validation::port_request(body)?;
        on_blocking(state.registry(), move |manager| {
            operation(
                manager,
                &request.device.manufacturer,
                &request.device.target,
                request.outlet,
            )
        })
        .await
    };
    reply(outcome.await)
}

pub(super) async fn get_version(State(state): State<AppState>) -> ApiResponse<VersionData> {
    reply(
        on_blocking(state.registry(), |manager| {
            Ok(VersionData {
                version: manager.get_version(),
            })
        })
        .await,
    )
}

pub(super) async fn get_pdu_info(
    State(state): State<AppState>,
    body: Result<Json<PduRequestBody>, JsonRejection>,
) -> ApiResponse<PduInfo> {
    let outcome = async {
        let request = validation::device_request(body)?;
        on_blocking(state.registry(), move |manager| {
            manager.get_pdu_info(&request.manufacturer, &request.target)
        })
        .await
    };
    reply(outcome.await)
}

pub(super) async fn get_port_info(
    State(state): State<AppState>,
    body: Result<Json<PortRequestBody>, JsonRejection>,
) -> ApiResponse<PortInfo> {
    port_operation(state, body, PduLibraryManager::get_port_info).await
}

pub(super) async fn power_on(
    State(state): State<AppState>,
    body: Result<Json<PortRequestBody>, JsonRejection>,
) -> ApiResponse<PowerStatus> {
    port_operation(state, body, PduLibraryManager::power_on).await
}

pub(super) async fn power_off(
    State(state): State<AppState>,
    body: Result<Json<PortRequestBody>, JsonRejection>,
) -> ApiResponse<PowerStatus> {
    port_operation(state, body, PduLibraryManager::power_off).await
}

pub(super) async fn reboot(
    State(state): State<AppState>,
    body: Result<Json<PortRequestBody>, JsonRejection>,
) -> ApiResponse<PowerStatus> {
    port_operation(state, body, PduLibraryManager::reboot).await
}

pub(super) async fn shutdown_server(State(state): State<AppState>) -> ApiResponse<String> {
    info!(target: HTTP_TARGET, "shutdown requested over http");
    state.shutdown_trigger().fire();
    reply(Ok("Rest server shutting down".to_owned()))
}

pub(super) async fn api_spec(State(state): State<AppState>) -> Json<Value> {
    Json(openapi::document(state.prefix()))
}
