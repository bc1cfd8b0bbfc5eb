//! OpenAPI 3 description served at `/v1/spec`.

use pdu_config::UrlPrefix;
use serde_json::{Value, json};

fn envelope(data: &Value) -> Value {
    json!({
        "type": "object",
        "required": ["ErrorCode", "Message", "Data"],
        "properties": {
            "ErrorCode": {"type": "integer"},
            "Message": {"type": "string", "nullable": true},
            "Data": data,
        }
    })
}

fn operation(summary: &str, body: Option<&str>, data: &Value) -> Value {
    let mut op = json!({
        "summary": summary,
        "responses": {
            "200": {
                "description": "Success",
                "content": {"application/json": {"schema": envelope(data)}}
            },
            "400": {"description": "Validation failure"},
            "500": {"description": "Operation failure"}
        }
    });
    if let (Some(schema), Some(fields)) = (body, op.as_object_mut()) {
        fields.insert(
            "requestBody".to_owned(),
            json!({
                "required": true,
                "content": {"application/json": {"schema": {"$ref": format!("#/components/schemas/{schema}")}}}
            }),
        );
    }
    op
}

/// Builds the document for a server mounted under `prefix`.
pub fn document(prefix: Option<&UrlPrefix>) -> Value {
    let status = json!({"$ref": "#/components/schemas/PowerStatus"});
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "PDU Library REST API",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "servers": [{"url": prefix.map_or("/", UrlPrefix::as_str)}],
        "paths": {
            "/v1/get_version": {
                "get": operation(
                    "Library version",
                    None,
                    &json!({"type": "object", "properties": {"version": {"type": "string"}}}),
                )
            },
            "/v1/get_pdu_info": {
                "post": operation(
                    "PDU metadata and outlet summary",
                    Some("PduRequest"),
                    &json!({"$ref": "#/components/schemas/PduInfo"}),
                )
            },
            "/v1/get_port_info": {
                "post": operation(
                    "Outlet metadata, sensors and state",
                    Some("PortRequest"),
                    &json!({"$ref": "#/components/schemas/PortInfo"}),
                )
            },
            "/v1/power_on": {"post": operation("Switch an outlet on", Some("PortRequest"), &status)},
            "/v1/power_off": {"post": operation("Switch an outlet off", Some("PortRequest"), &status)},
            "/v1/reboot": {"post": operation("Power-cycle an outlet", Some("PortRequest"), &status)},
            "/v1/shutdownserver": {
                "post": operation("Stop the server gracefully", None, &json!({"type": "string"}))
            },
            "/v1/spec": {
                "get": operation("This document", None, &json!({"type": "object"}))
            }
        },
        "components": {"schemas": schemas()}
    })
}

fn schemas() -> Value {
    let text = json!({"type": "string"});
    json!({
        "PduRequest": {
            "type": "object",
            "required": ["manufacturer", "ip", "username", "password"],
            "properties": {
                "manufacturer": {"type": "string", "enum": ["raritan", "dli", "apc", "aten"]},
                "ip": text,
                "username": text,
                "password": text,
            }
        },
        "PortRequest": {
            "allOf": [
                {"$ref": "#/components/schemas/PduRequest"},
                {
                    "type": "object",
                    "required": ["port"],
                    "properties": {"port": {"type": "integer", "minimum": 1}}
                }
            ]
        },
        "PowerStatus": {
            "type": "object",
            "properties": {
                "powerState": {"type": "string", "enum": ["ON", "OFF"]},
                "lastPowerStateChangeTime": {"type": "string", "format": "date-time"},
            }
        },
        "PduInfo": {
            "type": "object",
            "properties": {
                "manufacturer": text,
                "model": text,
                "serialNumber": text,
                "ctrlBoardSerial": text,
                "fwRevision": text,
                "macAddress": text,
                "voltage": text,
                "current": text,
                "frequency": text,
                "power": text,
                "outlets": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "portNumber": {"type": "integer"},
                            "portName": text,
                            "portStatus": text,
                        }
                    }
                }
            }
        },
        "PortInfo": {
            "type": "object",
            "properties": {
                "portNumber": {"type": "integer"},
                "receptacleType": text,
                "current": text,
                "minVoltage": text,
                "maxVoltage": text,
                "sensorData": {"type": "object"},
                "stateData": {"type": "object"},
            }
        }
    })
}
