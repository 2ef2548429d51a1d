//! Call signalling endpoints, Socket.IO reachability and error format

use serde_json::{json, Value};

use crate::client::{ApiClient, ApiRequest};
use crate::error::{HarnessError, HarnessResult};
use crate::expect::{ensure, preview, require_str, StatusPolicy};
use crate::harness::Harness;
use crate::results::Pass;
use crate::socketio;

/// Every call endpoint with a plausible payload
pub fn call_endpoints() -> Vec<(&'static str, Value)> {
    vec![
        ("start", json!({"recipientId": "test123", "callType": "voice"})),
        ("accept", json!({"callId": "test123", "callType": "voice"})),
        ("reject", json!({"callId": "test123"})),
        ("end", json!({"callId": "test123"})),
        ("offer", json!({"callId": "test123", "offer": "test_offer"})),
        ("answer", json!({"callId": "test123", "answer": "test_answer"})),
        ("ice-candidate", json!({"callId": "test123", "candidate": "test_candidate"})),
    ]
}

pub async fn run(h: &mut Harness) {
    for (endpoint, payload) in call_endpoints() {
        call_requires_auth(h, endpoint, payload).await;
    }
    socket_io_connectivity(h).await;
    socket_io_handshake(h).await;
    error_response_format(h).await;
}

/// An unauthenticated POST to `/calls/<endpoint>` must be refused with 401.
pub async fn call_requires_auth(h: &mut Harness, endpoint: &str, payload: Value) -> bool {
    let outcome = check_call_requires_auth(&h.client, endpoint, payload).await;
    h.record(format!("Auth Test - {}", endpoint), outcome)
}

async fn check_call_requires_auth(client: &ApiClient, endpoint: &str, payload: Value) -> HarnessResult<Pass> {
    let request = ApiRequest::post("/calls").segment(endpoint).json(payload).anonymous();
    let body = client.call(request, StatusPolicy::Exactly(401)).await?;

    let message = require_str(&body, "message")?;
    let lowered = message.to_lowercase();
    ensure(
        lowered.contains("token") || lowered.contains("auth"),
        "auth error message mentions a token or auth",
        json!("token|auth"),
        json!(message),
    )?;

    Ok(Pass::new(format!("Proper auth error: {}", message)))
}

pub async fn socket_io_connectivity(h: &mut Harness) -> bool {
    let outcome = check_socket_io_connectivity(&h.client).await;
    h.record("Socket.IO Connectivity", outcome)
}

async fn check_socket_io_connectivity(client: &ApiClient) -> HarnessResult<Pass> {
    // A bare GET without transport parameters is refused by the server itself
    let response = client.send(ApiRequest::get("/socket.io/").at_root()).await?;
    response.expect_status(StatusPolicy::OneOf(&[200, 400, 404]))?;

    let message = if response.status_code() == 200 {
        "Socket.IO server is accessible"
    } else {
        "Socket.IO endpoint responds (expected 400/404)"
    };
    Ok(Pass::new(message).with_details(json!({ "status": response.status_code() })))
}

/// Engine.IO polling handshake: the open packet must carry a session id.
pub async fn socket_io_handshake(h: &mut Harness) -> bool {
    let outcome = check_socket_io_handshake(&h.client).await;
    h.record("Socket.IO Handshake", outcome)
}

async fn check_socket_io_handshake(client: &ApiClient) -> HarnessResult<Pass> {
    let request = ApiRequest::get("/socket.io/")
        .at_root()
        .query("EIO", "4")
        .query("transport", "polling");
    let response = client.send(request).await?;
    response.expect_status(StatusPolicy::Exactly(200))?;

    let payload = match response.body_value() {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    };
    let handshake = socketio::parse_open_packet(&payload)?;

    Ok(Pass::new(format!("Handshake opened session {}", handshake.sid)).with_details(json!(handshake)))
}

/// Unknown API routes must answer with something other than an HTML page.
pub async fn error_response_format(h: &mut Harness) -> bool {
    let outcome = check_error_response_format(&h.client).await;
    h.record("Error Response Format", outcome)
}

async fn check_error_response_format(client: &ApiClient) -> HarnessResult<Pass> {
    let response = client.send(ApiRequest::get("/nonexistent")).await?;

    if response.is_json() {
        return Ok(Pass::new("Returns proper JSON errors").with_details(response.body_value()));
    }

    if response.content_type().contains("application/json") {
        return Err(HarnessError::MissingField {
            field: "<body>".to_string(),
            expected: "valid JSON behind an application/json content type",
            body: response.body_value(),
        });
    }

    if response.looks_like_html() {
        return Err(HarnessError::Assertion {
            what: "error responses are not HTML pages".to_string(),
            expected: json!("application/json"),
            actual: json!({
                "content_type": response.content_type(),
                "body": preview(response.text().unwrap_or_default(), 200),
            }),
        });
    }

    Ok(Pass::new("Returns non-HTML error responses"))
}
