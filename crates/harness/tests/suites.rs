//! Suites run end to end against a mock backend

mod common;

use chirpcheck_harness::scenarios::{calls, lists, tweets};
use chirpcheck_harness::{ApiRequest, Harness, HarnessConfig, HarnessError, StatusPolicy, Suite};
use common::*;
use serde_json::json;
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_calls(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/api/calls/[a-z-]+$"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "No token, authorization denied" })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/socket.io/"))
        .and(query_param("EIO", "4"))
        .and(query_param("transport", "polling"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"0{"sid":"mock-sid","upgrades":["websocket"],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
            "text/plain; charset=UTF-8",
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/socket.io/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "code": 0, "message": "Transport unknown" })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/nonexistent"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Route not found" })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_calls_suite_passes_against_conforming_backend() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    mount_calls(&server).await;

    let mut harness = harness_for(&server);
    harness.run(Suite::Calls).await.unwrap();

    let summary = harness.summary();
    let failures: Vec<_> = harness.results().failures().collect();
    assert!(failures.is_empty(), "unexpected failures: {:#?}", failures);
    assert_eq!(summary.total, 11);
    assert_eq!(harness.results().exit_code(), 0);

    let names: Vec<&str> = harness.results().results().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names[0], "Server Health Check");
    assert_eq!(names[1], "Auth Test - start");
    assert_eq!(names[7], "Auth Test - ice-candidate");
    assert_eq!(names[10], "Error Response Format");
}

#[tokio::test]
async fn test_failed_health_check_aborts_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "message": "starting" })))
        .mount(&server)
        .await;

    let mut harness = harness_for(&server);
    let err = harness.run(Suite::All).await.unwrap_err();

    assert!(matches!(err, HarnessError::SetupAborted(_)));
    assert_eq!(harness.results().len(), 1);
    let result = &harness.results().results()[0];
    assert_eq!(result.name, "Server Health Check");
    assert!(!result.success);
    assert_eq!(result.details.as_ref().unwrap()["actual"], 503);
    assert_eq!(harness.results().exit_code(), 1);
}

#[tokio::test]
async fn test_unreachable_backend_is_a_transport_failure() {
    init_logging();
    let config = HarnessConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        timeout_secs: 2,
        ..Default::default()
    };
    let mut harness = Harness::new(config).unwrap();

    assert!(harness.run(Suite::Calls).await.is_err());
    let result = &harness.results().results()[0];
    assert!(!result.success);
    let kind = result.details.as_ref().unwrap()["kind"].as_str().unwrap();
    assert!(kind == "transport" || kind == "timeout", "kind was {}", kind);
}

#[tokio::test]
async fn test_auth_suite_registers_and_verifies_both_principals() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    mount_principals(&server).await;

    let mut harness = harness_for(&server);
    harness.run(Suite::Auth).await.unwrap();

    let failures: Vec<_> = harness.results().failures().collect();
    assert!(failures.is_empty(), "unexpected failures: {:#?}", failures);
    assert_eq!(harness.summary().total, 7);

    let (alice, bob) = harness.fixtures().pair().unwrap();
    assert_eq!(alice.id, ALICE_ID);
    assert_eq!(bob.token, BOB_TOKEN);
    assert_eq!(harness.client().token(), Some(ALICE_TOKEN));
}

#[tokio::test]
async fn test_failed_registration_aborts_suite() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "message": "User already exists" })))
        .mount(&server)
        .await;

    let mut harness = harness_for(&server);
    let err = harness.run(Suite::Tweets).await.unwrap_err();

    assert!(matches!(err, HarnessError::SetupAborted(_)));
    let names: Vec<&str> = harness.results().failures().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Register User A"]);
}

#[tokio::test]
async fn test_html_error_page_fails_error_format_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/nonexistent"))
        .respond_with(
            ResponseTemplate::new(404).set_body_raw("<!DOCTYPE html><html><body>Cannot GET</body></html>", "text/html"),
        )
        .mount(&server)
        .await;

    let mut harness = harness_for(&server);
    assert!(!calls::error_response_format(&mut harness).await);

    let details = harness.results().results()[0].details.clone().unwrap();
    assert_eq!(details["kind"], "assertion");
    assert_eq!(details["actual"]["content_type"], "text/html");
}

#[tokio::test]
async fn test_unparseable_json_error_body_fails_error_format_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/nonexistent"))
        .respond_with(ResponseTemplate::new(404).set_body_raw("Route not found", "application/json"))
        .mount(&server)
        .await;

    let mut harness = harness_for(&server);
    assert!(!calls::error_response_format(&mut harness).await);

    let details = harness.results().results()[0].details.clone().unwrap();
    assert_eq!(details["kind"], "missing_field");
    assert_eq!(details["body"], "Route not found");
}

#[tokio::test]
async fn test_json_error_body_passes_error_format_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/nonexistent"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Route not found" })))
        .mount(&server)
        .await;

    let mut harness = harness_for(&server);
    assert!(calls::error_response_format(&mut harness).await);
    let result = &harness.results().results()[0];
    assert_eq!(result.message, "Returns proper JSON errors");
    assert_eq!(result.details.as_ref().unwrap()["message"], "Route not found");
}

async fn mount_tweet(server: &MockServer, likes: u64) {
    Mock::given(method("GET"))
        .and(path("/api/tweets/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "t1",
            "content": "hello world",
            "likesCount": likes,
            "isLiked": false,
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_like_toggle_round_trips() {
    let server = MockServer::start().await;
    mount_tweet(&server, 0).await;
    Mock::given(method("POST"))
        .and(path("/api/tweets/t1/like"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "isLiked": true, "likesCount": 1 })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tweets/t1/like"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "isLiked": false, "likesCount": 0 })))
        .mount(&server)
        .await;

    let mut harness = harness_for(&server);
    assert!(tweets::toggle_twice(&mut harness, "t1", &tweets::LIKE).await);
    assert_eq!(harness.results().results()[0].name, "Like Toggle");
}

#[tokio::test]
async fn test_like_toggle_detects_count_drift() {
    let server = MockServer::start().await;
    mount_tweet(&server, 0).await;
    Mock::given(method("POST"))
        .and(path("/api/tweets/t1/like"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "isLiked": true, "likesCount": 1 })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tweets/t1/like"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "isLiked": false, "likesCount": 1 })))
        .mount(&server)
        .await;

    let mut harness = harness_for(&server);
    assert!(!tweets::toggle_twice(&mut harness, "t1", &tweets::LIKE).await);

    let details = harness.results().results()[0].details.clone().unwrap();
    assert_eq!(details["kind"], "assertion");
    assert_eq!(details["expected"], 0);
    assert_eq!(details["actual"], 1);
}

#[tokio::test]
async fn test_list_lifecycle_reports_stage_reached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/lists"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "_id": "l1", "name": "Reading 1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/lists/l1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_id": "l1", "name": "Reading 1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "_id": "l1" }])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/lists/l1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_id": "l1", "name": "Reading 2" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/lists/l1/pin"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "Server error" })))
        .mount(&server)
        .await;

    let mut harness = harness_for(&server);
    assert!(!lists::list_lifecycle(&mut harness, "Reading 1", "Reading 2").await);

    assert_eq!(harness.results().len(), 1);
    let result = &harness.results().results()[0];
    assert_eq!(result.name, "List Lifecycle");
    assert!(result.message.starts_with("Aborted after `updated`"));
    let details = result.details.as_ref().unwrap();
    assert_eq!(details["kind"], "aborted");
    assert_eq!(details["completed"].as_array().unwrap().len(), 4);
    assert_eq!(details["cause"]["actual"], 500);
}

#[tokio::test]
async fn test_independent_harnesses_do_not_share_results() {
    let healthy = MockServer::start().await;
    mount_health(&healthy).await;
    mount_calls(&healthy).await;

    let down = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&down)
        .await;

    let mut a = harness_for(&healthy);
    let mut b = harness_for(&down);
    let (ra, rb) = tokio::join!(a.run(Suite::Calls), b.run(Suite::Calls));

    assert!(ra.is_ok());
    assert!(rb.is_err());
    assert_eq!(a.summary().total, 11);
    assert_eq!(a.summary().failed, 0);
    assert_eq!(b.summary().total, 1);
    assert_eq!(b.summary().failed, 1);
}

#[tokio::test]
async fn test_explicit_bearer_overrides_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer other"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": user("u-other", "other") })))
        .mount(&server)
        .await;

    let harness = harness_for(&server);
    let client = harness.client();
    let body = client
        .call(
            ApiRequest::get("/auth/me").bearer("other"),
            StatusPolicy::Exactly(200),
        )
        .await
        .unwrap();
    assert_eq!(body["user"]["_id"], "u-other");
    assert_eq!(client.token(), None);
    assert!(harness.results().is_empty());
}
