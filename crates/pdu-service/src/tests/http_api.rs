//! End-to-end requests against a launched server.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use crate::lifecycle::{LifecycleCoordinator, ServerHandle, ServerState};
use crate::marker::LivenessMarker;
use crate::tests::support::{STOP_BUDGET, ServiceHarness, StubDriver, wait_until};

struct RunningServer {
    harness: ServiceHarness,
    coordinator: LifecycleCoordinator,
    handle: Option<ServerHandle>,
    client: Client,
}

impl RunningServer {
    fn launch(harness: ServiceHarness, prefix: &str) -> Self {
        let coordinator = harness.coordinator();
        coordinator.set_url_prefix(prefix).expect("store prefix");
        let handle = coordinator.launch(false).expect("launch server");
        Self {
            harness,
            coordinator,
            handle: Some(handle),
            client: Client::new(),
        }
    }

    fn post(&self, route: &str, body: &Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(self.harness.url(route))
            .json(body)
            .send()
            .expect("send request");
        let status = response.status();
        (status, response.json().expect("json body"))
    }

    fn get(&self, route: &str) -> (StatusCode, Option<Value>) {
        let response = self
            .client
            .get(self.harness.url(route))
            .send()
            .expect("send request");
        let status = response.status();
        (status, response.json().ok())
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        let _ = self.coordinator.stop(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn port_body(manufacturer: &str, port: i64) -> Value {
    json!({
        "manufacturer": manufacturer,
        "ip": "10.1.1.20",
        "username": "admin",
        "password": "secret",
        "port": port,
    })
}

#[fixture]
fn server() -> RunningServer {
    RunningServer::launch(ServiceHarness::new(), "")
}

#[rstest]
fn version_is_enveloped(server: RunningServer) {
    let (status, body) = server.get("/v1/get_version");
    let body = body.expect("json body");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ErrorCode"], 0);
    let version = body["Data"]["version"].as_str().expect("version string");
    assert!(version.starts_with("PduLibrary:"), "got {version}");
}

#[rstest]
fn pdu_info_comes_from_the_driver(server: RunningServer) {
    let (status, body) = server.post(
        "/v1/get_pdu_info",
        &json!({"manufacturer": "DLI", "ip": "10.1.1.20", "username": "admin", "password": "x"}),
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Data"]["manufacturer"], "Stub");
    assert_eq!(body["Data"]["model"], "SW-8");
}

#[rstest]
#[case::on("/v1/power_on", "ON")]
#[case::off("/v1/power_off", "OFF")]
#[case::reboot("/v1/reboot", "ON")]
fn power_operations_report_requested_state(
    server: RunningServer,
    #[case] route: &str,
    #[case] expected: &str,
) {
    let (status, body) = server.post(route, &port_body("dli", 2));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ErrorCode"], 0);
    assert_eq!(body["Data"]["powerState"], expected);
    assert!(body["Data"]["lastPowerStateChangeTime"].is_string());
    assert_eq!(server.harness.driver.calls(), 1);
}

#[rstest]
fn port_info_reports_outlet(server: RunningServer) {
    let (status, body) = server.post("/v1/get_port_info", &port_body("dli", 4));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Data"]["portNumber"], 4);
    assert_eq!(body["Data"]["stateData"]["powerState"], "ON");
}

#[rstest]
fn driver_failure_is_a_server_error() {
    let server = RunningServer::launch(ServiceHarness::with_driver(StubDriver::failing()), "");
    let (status, body) = server.post("/v1/power_on", &port_body("dli", 1));
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["ErrorCode"], 22);
    assert!(body["Data"].is_null());
    assert!(!body["Message"].as_str().unwrap_or_default().is_empty());
}

#[rstest]
fn unknown_manufacturer_never_reaches_a_driver(server: RunningServer) {
    let (status, body) = server.post("/v1/power_off", &port_body("cyberpower", 1));
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["ErrorCode"], 10);
    assert_eq!(server.harness.driver.calls(), 0);
}

#[rstest]
#[case::missing_manufacturer(json!({"ip": "10.1.1.20", "username": "a", "password": "b", "port": 1}))]
#[case::blank_ip(json!({"manufacturer": "dli", "ip": " ", "username": "a", "password": "b", "port": 1}))]
#[case::missing_port(json!({"manufacturer": "dli", "ip": "10.1.1.20", "username": "a", "password": "b"}))]
#[case::port_zero(port_body("dli", 0))]
#[case::wrong_type(json!({"manufacturer": "dli", "ip": "10.1.1.20", "username": "a", "password": "b", "port": "one"}))]
fn invalid_bodies_are_rejected(server: RunningServer, #[case] body: Value) {
    let (status, reply) = server.post("/v1/reboot", &body);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["ErrorCode"], 40);
    assert!(reply["Data"].is_null());
    assert_eq!(server.harness.driver.calls(), 0);
}

#[rstest]
fn routes_nest_under_the_prefix() {
    let server = RunningServer::launch(ServiceHarness::new(), "/pdu/");
    let (status, _) = server.get("/pdu/v1/get_version");
    assert_eq!(status, StatusCode::OK);
    let (unprefixed, _) = server.get("/v1/get_version");
    assert_eq!(unprefixed, StatusCode::NOT_FOUND);

    let (_, document) = server.get("/pdu/v1/spec");
    let document = document.expect("openapi document");
    assert_eq!(document["servers"][0]["url"], "/pdu");
}

#[rstest]
fn api_document_lists_every_route(server: RunningServer) {
    let (status, document) = server.get("/v1/spec");
    let document = document.expect("openapi document");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(document["openapi"], "3.0.3");
    for route in [
        "/v1/get_version",
        "/v1/get_pdu_info",
        "/v1/get_port_info",
        "/v1/power_on",
        "/v1/power_off",
        "/v1/reboot",
        "/v1/shutdownserver",
        "/v1/spec",
    ] {
        assert!(document["paths"].get(route).is_some(), "missing {route}");
    }
}

#[rstest]
fn shutdown_route_stops_the_server(mut server: RunningServer) {
    let (status, body) = server.post("/v1/shutdownserver", &json!({}));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Data"], "Rest server shutting down");

    server
        .handle
        .take()
        .expect("handle")
        .join()
        .expect("server stops cleanly");
    assert!(!LivenessMarker::from_paths(&server.harness.paths()).is_present());
}

#[rstest]
fn local_stop_waits_for_in_flight_requests() {
    let harness = ServiceHarness::with_driver(StubDriver::slow(Duration::from_millis(800)));
    let coordinator = harness
        .coordinator()
        .with_shutdown_timeout(Duration::from_millis(10));
    let handle = coordinator.launch(false).expect("launch server");

    let url = harness.url("/v1/get_pdu_info");
    let request = thread::spawn(move || {
        Client::new()
            .post(url)
            .json(&json!({"manufacturer": "dli", "ip": "10.1.1.20", "username": "a", "password": "b"}))
            .send()
            .map(|response| response.status())
    });
    let driver = Arc::clone(&harness.driver);
    assert!(
        wait_until(STOP_BUDGET, || driver.calls() == 1),
        "request never reached the driver"
    );

    coordinator
        .stop(false)
        .expect("local stop outlasts the shutdown budget");
    assert!(!LivenessMarker::from_paths(&harness.paths()).is_present());
    assert_eq!(coordinator.state(), ServerState::Stopped);

    let status = request
        .join()
        .expect("request thread")
        .expect("in-flight request completes");
    assert_eq!(status, StatusCode::OK);
    handle.join().expect("serve thread already reaped");
}
