//! Mock backend shared by the suite tests
#![allow(dead_code)]

use chirpcheck_harness::scenarios::health::HEALTH_BANNER;
use chirpcheck_harness::{Harness, HarnessConfig};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const RUN_TAG: &str = "test";

pub const ALICE_ID: &str = "u-alice";
pub const ALICE_TOKEN: &str = "token-alice";
pub const ALICE_LOGIN_TOKEN: &str = "token-alice-login";
pub const BOB_ID: &str = "u-bob";
pub const BOB_TOKEN: &str = "token-bob";

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("chirpcheck_harness=debug")
        .with_test_writer()
        .try_init();
}

pub fn alice_username() -> String {
    format!("alice_{}", RUN_TAG)
}

pub fn bob_username() -> String {
    format!("bob_{}", RUN_TAG)
}

pub fn user(id: &str, username: &str) -> Value {
    json!({ "_id": id, "username": username, "displayName": username })
}

pub fn config_for(server: &MockServer) -> HarnessConfig {
    HarnessConfig {
        base_url: server.uri(),
        timeout_secs: 5,
        ..Default::default()
    }
}

pub fn harness_for(server: &MockServer) -> Harness {
    init_logging();
    Harness::new(config_for(server))
        .expect("valid config")
        .with_run_tag(RUN_TAG)
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub async fn mount_health(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "message": HEALTH_BANNER,
            "timestamp": "2024-01-01T00:00:00.000Z",
        })))
        .mount(server)
        .await;
}

/// Registration, login and `/auth/me` for User A and User B.
pub async fn mount_principals(server: &MockServer) {
    for (id, username, token) in [
        (ALICE_ID, alice_username(), ALICE_TOKEN),
        (BOB_ID, bob_username(), BOB_TOKEN),
    ] {
        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .and(body_partial_json(json!({ "username": username })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "message": "User registered successfully",
                "token": token,
                "user": user(id, &username),
            })))
            .mount(server)
            .await;
    }

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_partial_json(json!({ "email": format!("{}@example.com", alice_username()) })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": ALICE_LOGIN_TOKEN,
            "user": user(ALICE_ID, &alice_username()),
        })))
        .mount(server)
        .await;

    for (id, username, token) in [
        (ALICE_ID, alice_username(), ALICE_TOKEN),
        (ALICE_ID, alice_username(), ALICE_LOGIN_TOKEN),
        (BOB_ID, bob_username(), BOB_TOKEN),
    ] {
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .and(header("authorization", bearer(token).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": user(id, &username) })))
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "No token, authorization denied" })))
        .mount(server)
        .await;
}
