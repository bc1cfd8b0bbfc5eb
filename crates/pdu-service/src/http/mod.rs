//! HTTP adapter exposing the PDU operations and lifecycle endpoints.
//!
//! Every JSON route answers with the `{ErrorCode, Message, Data}` envelope.
//! Validation failures map to HTTP 400 and every other failure to HTTP 500.
//! Driver calls run on the blocking pool because vendor protocols are
//! synchronous.

mod handlers;
mod openapi;
mod validation;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use pdu_config::UrlPrefix;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use openapi::document as api_document;
pub use validation::{DeviceRequest, PortRequest, ValidationError, device_request, port_request};

use crate::lifecycle::ShutdownTrigger;
use crate::registry::SingletonRegistry;

pub(crate) const HTTP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::http");

/// Route that asks the server to stop.
pub const SHUTDOWN_ROUTE: &str = "/v1/shutdownserver";
/// Route serving the OpenAPI document.
pub const SPEC_ROUTE: &str = "/v1/spec";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<SingletonRegistry>,
    shutdown: ShutdownTrigger,
    prefix: Option<UrlPrefix>,
}

impl AppState {
    /// State for a server stopped through `shutdown`.
    #[must_use]
    pub const fn new(
        registry: Arc<SingletonRegistry>,
        shutdown: ShutdownTrigger,
        prefix: Option<UrlPrefix>,
    ) -> Self {
        Self {
            registry,
            shutdown,
            prefix,
        }
    }

    fn registry(&self) -> Arc<SingletonRegistry> {
        Arc::clone(&self.registry)
    }

    const fn shutdown_trigger(&self) -> &ShutdownTrigger {
        &self.shutdown
    }

    const fn prefix(&self) -> Option<&UrlPrefix> {
        self.prefix.as_ref()
    }
}

/// Builds the application router, nested under the prefix when one is set.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let prefix = state.prefix.clone();

    let routes = Router::new()
        .route("/v1/get_version", get(handlers::get_version))
        .route("/v1/get_pdu_info", post(handlers::get_pdu_info))
        .route("/v1/get_port_info", post(handlers::get_port_info))
        .route("/v1/power_on", post(handlers::power_on))
        .route("/v1/power_off", post(handlers::power_off))
        .route("/v1/reboot", post(handlers::reboot))
        .route(SHUTDOWN_ROUTE, post(handlers::shutdown_server))
        .route(SPEC_ROUTE, get(handlers::api_spec))
        .with_state(state);

    let app = match prefix {
        Some(mount) => Router::new().nest(mount.as_str(), routes),
        None => routes,
    };
    app.layer(cors).layer(TraceLayer::new_for_http())
}
