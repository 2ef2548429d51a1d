//! List, bookmark and moment chains against a mock backend

mod common;

use chirpcheck_harness::{Harness, Suite, TestResult};
use common::*;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn start() -> MockServer {
    let server = MockServer::start().await;
    mount_health(&server).await;
    mount_principals(&server).await;
    server
}

/// Respond with each body in turn, the last one for every later request.
async fn mount_sequence(server: &MockServer, verb: &str, route: &str, replies: Vec<(u16, Value)>) {
    let last = replies.len().saturating_sub(1);
    for (i, (status, body)) in replies.into_iter().enumerate() {
        let mock = Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_json(body));
        if i < last {
            mock.up_to_n_times(1).mount(server).await;
        } else {
            mock.mount(server).await;
        }
    }
}

async fn mount_one(server: &MockServer, verb: &str, route: &str, status: u16, body: Value) {
    mount_sequence(server, verb, route, vec![(status, body)]).await;
}

fn only_result<'a>(harness: &'a Harness, name: &str) -> &'a TestResult {
    let matching: Vec<&TestResult> = harness.results().results().iter().filter(|r| r.name == name).collect();
    assert_eq!(matching.len(), 1, "expected one {:?} result", name);
    matching[0]
}

fn deleted() -> Value {
    json!({ "message": "Deleted" })
}

fn not_found() -> Value {
    json!({ "message": "Not found" })
}

async fn mount_list(server: &MockServer, gone_after_delete: bool) {
    mount_one(server, "POST", "/api/lists", 201, json!({ "_id": "l1", "name": "Reading test" })).await;

    let after_delete = if gone_after_delete {
        (404, not_found())
    } else {
        (200, json!({ "_id": "l1", "name": "Reading v2 test" }))
    };
    mount_sequence(
        server,
        "GET",
        "/api/lists/l1",
        vec![(200, json!({ "_id": "l1", "name": "Reading test" })), after_delete],
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/api/lists"))
        .and(query_param("type", "pinned"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "_id": "l1", "isPinned": true }])))
        .mount(server)
        .await;
    mount_one(server, "GET", "/api/lists", 200, json!([{ "_id": "l1" }])).await;

    mount_one(server, "PUT", "/api/lists/l1", 200, json!({ "_id": "l1", "name": "Reading v2 test" })).await;
    mount_sequence(
        server,
        "POST",
        "/api/lists/l1/pin",
        vec![(200, json!({ "isPinned": true })), (200, json!({ "isPinned": false }))],
    )
    .await;
    mount_one(server, "DELETE", "/api/lists/l1", 200, deleted()).await;
}

#[tokio::test]
async fn test_list_suite_completes_every_stage() {
    let server = start().await;
    mount_list(&server, true).await;

    let mut harness = harness_for(&server);
    harness.run(Suite::Lists).await.unwrap();

    let result = only_result(&harness, "List Lifecycle");
    assert!(result.success, "{:#?}", result);
    assert_eq!(
        result.message,
        "List lifecycle completed: created → read → listed → updated → pinned → unpinned → deleted"
    );
    assert_eq!(harness.results().exit_code(), 0);
}

#[tokio::test]
async fn test_list_still_fetchable_after_delete_aborts() {
    let server = start().await;
    mount_list(&server, false).await;

    let mut harness = harness_for(&server);
    harness.run(Suite::Lists).await.unwrap();

    let result = only_result(&harness, "List Lifecycle");
    assert!(!result.success);
    let details = result.details.clone().unwrap();
    assert_eq!(details["kind"], "aborted");
    assert_eq!(details["reached"], "unpinned");
    assert_eq!(details["cause"]["expected"], "HTTP 404");
    assert_eq!(details["cause"]["actual"], 200);
}

async fn mount_bookmarks(server: &MockServer, duplicate_status: u16) {
    mount_one(server, "POST", "/api/tweets", 201, json!({ "_id": "t-b", "content": "Worth keeping for later" })).await;
    mount_sequence(
        server,
        "POST",
        "/api/bookmarks/t-b",
        vec![
            (201, json!({ "message": "Tweet bookmarked", "bookmarkId": "b1" })),
            (duplicate_status, json!({ "message": "Tweet already bookmarked" })),
        ],
    )
    .await;
    mount_sequence(
        server,
        "GET",
        "/api/bookmarks/check/t-b",
        vec![(200, json!({ "isBookmarked": true })), (200, json!({ "isBookmarked": false }))],
    )
    .await;
    mount_one(server, "GET", "/api/bookmarks", 200, json!([{ "_id": "t-b" }])).await;
    mount_sequence(
        server,
        "DELETE",
        "/api/bookmarks/t-b",
        vec![(200, json!({ "message": "Bookmark removed" })), (404, json!({ "message": "Bookmark not found" }))],
    )
    .await;
}

#[tokio::test]
async fn test_bookmark_suite_completes_every_stage() {
    let server = start().await;
    mount_bookmarks(&server, 400).await;

    let mut harness = harness_for(&server);
    harness.run(Suite::Bookmarks).await.unwrap();

    let result = only_result(&harness, "Bookmark Lifecycle");
    assert!(result.success, "{:#?}", result);
    assert_eq!(
        result.message,
        "Bookmark lifecycle completed: tweeted → created → checked → listed → duplicate rejected → deleted → second removal rejected"
    );
}

#[tokio::test]
async fn test_duplicate_bookmark_accepted_aborts() {
    let server = start().await;
    mount_bookmarks(&server, 201).await;

    let mut harness = harness_for(&server);
    harness.run(Suite::Bookmarks).await.unwrap();

    let result = only_result(&harness, "Bookmark Lifecycle");
    assert!(!result.success);
    assert!(result.message.starts_with("Aborted after `listed`"), "{}", result.message);
    let details = result.details.clone().unwrap();
    assert_eq!(details["cause"]["expected"], "HTTP 400");
    assert_eq!(details["cause"]["actual"], 201);
}

fn moment(tweets: Value) -> Value {
    json!({ "_id": "mo1", "title": "Harness moment test", "category": "Technology", "tweets": tweets })
}

async fn mount_moment(server: &MockServer, keeps_removed_tweet: bool) {
    mount_one(server, "POST", "/api/moments", 201, moment(json!([]))).await;

    let after_removal = if keeps_removed_tweet {
        moment(json!([{ "_id": "t-m" }]))
    } else {
        moment(json!([]))
    };
    mount_sequence(
        server,
        "GET",
        "/api/moments/mo1",
        vec![
            (200, moment(json!([]))),
            (200, moment(json!([{ "_id": "t-m", "content": "A moment worth collecting" }]))),
            (200, after_removal),
            (404, not_found()),
        ],
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/api/moments"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "_id": "mo1" }])))
        .mount(server)
        .await;

    mount_one(
        server,
        "PUT",
        "/api/moments/mo1",
        200,
        json!({ "_id": "mo1", "title": "Harness moment test (updated)" }),
    )
    .await;
    mount_one(server, "POST", "/api/tweets", 201, json!({ "_id": "t-m", "content": "A moment worth collecting" })).await;
    mount_one(server, "POST", "/api/moments/mo1/tweets/t-m", 200, moment(json!(["t-m"]))).await;
    mount_one(server, "DELETE", "/api/moments/mo1/tweets/t-m", 200, moment(json!([]))).await;
    mount_one(server, "DELETE", "/api/moments/mo1", 200, deleted()).await;
}

#[tokio::test]
async fn test_moment_suite_curates_and_deletes() {
    let server = start().await;
    mount_moment(&server, false).await;

    let mut harness = harness_for(&server);
    harness.run(Suite::Moments).await.unwrap();

    let result = only_result(&harness, "Moment Lifecycle");
    assert!(result.success, "{:#?}", result);
    assert_eq!(
        result.message,
        "Moment lifecycle completed: created → read → listed → updated → tweet added → tweet removed → deleted"
    );
}

#[tokio::test]
async fn test_removed_tweet_still_in_moment_aborts() {
    let server = start().await;
    mount_moment(&server, true).await;

    let mut harness = harness_for(&server);
    harness.run(Suite::Moments).await.unwrap();

    let result = only_result(&harness, "Moment Lifecycle");
    assert!(!result.success);
    let details = result.details.clone().unwrap();
    assert_eq!(details["reached"], "tweet added");
    assert_eq!(details["cause"]["kind"], "assertion");
    assert_eq!(details["cause"]["actual"], json!(["t-m"]));
    assert_eq!(harness.client().token(), Some(ALICE_TOKEN));
}
