//! Tweet CRUD, feeds, like/retweet toggles and replies

use serde_json::{json, Value};

use crate::client::{ApiClient, ApiRequest};
use crate::error::HarnessResult;
use crate::expect::{ensure, ensure_eq, require_array, require_bool, require_ref, require_str, require_u64, StatusPolicy};
use crate::fixtures::Principal;
use crate::harness::Harness;
use crate::results::Pass;

/// Id no backend will have issued
pub const UNKNOWN_ID: &str = "00000000-0000-4000-8000-000000000000";

const FEED_LIMIT: usize = 5;

pub async fn run(h: &mut Harness) {
    let Some((alice, _)) = h.fixtures.pair() else {
        return;
    };

    feed_page(h, FEED_LIMIT).await;
    recommended_feed(h, FEED_LIMIT).await;
    feed_requires_auth(h).await;
    unknown_tweet(h).await;

    let Some(tweet_id) = create_tweet(h, "Create Tweet", "hello world", &alice).await else {
        return;
    };
    fetch_tweet(h, &tweet_id, "hello world").await;
    toggle_twice(h, &tweet_id, &LIKE).await;
    toggle_twice(h, &tweet_id, &RETWEET).await;
    reply(h, &tweet_id, &alice).await;
    delete_tweet(h, &tweet_id).await;
}

/// `POST /tweets` without recording a result.
pub(crate) async fn post_tweet(client: &ApiClient, content: &str) -> HarnessResult<Value> {
    client
        .call(
            ApiRequest::post("/tweets").json(json!({ "content": content })),
            StatusPolicy::Exactly(201),
        )
        .await
}

/// Create a tweet as the session identity, which must be `author`.
pub async fn create_tweet(h: &mut Harness, name: &str, content: &str, author: &Principal) -> Option<String> {
    let outcome = check_create_tweet(&h.client, content, author).await;

    let id = outcome.as_ref().ok().map(|(id, _)| id.clone());
    h.record(name, outcome.map(|(_, pass)| pass));
    id
}

async fn check_create_tweet(client: &ApiClient, content: &str, author: &Principal) -> HarnessResult<(String, Pass)> {
    let body = post_tweet(client, content).await?;

    let id = require_str(&body, "_id")?.to_string();
    ensure_eq("tweet content echoed", content, require_str(&body, "content")?)?;
    ensure_eq("tweet author", author.id.as_str(), require_ref(&body, "author")?)?;
    ensure_eq("new tweet likesCount", 0, require_u64(&body, "likesCount")?)?;
    ensure_eq("new tweet retweetsCount", 0, require_u64(&body, "retweetsCount")?)?;

    let pass = Pass::new(format!("Tweet {} created", id)).with_details(json!({ "tweet_id": id }));
    Ok((id, pass))
}

pub async fn fetch_tweet(h: &mut Harness, tweet_id: &str, content: &str) -> bool {
    let outcome = check_fetch_tweet(&h.client, tweet_id, content).await;
    h.record("Fetch Tweet", outcome)
}

async fn check_fetch_tweet(client: &ApiClient, tweet_id: &str, content: &str) -> HarnessResult<Pass> {
    let body = client
        .call(ApiRequest::get("/tweets").segment(tweet_id), StatusPolicy::Exactly(200))
        .await?;
    ensure_eq("fetched tweet id", tweet_id, require_str(&body, "_id")?)?;
    ensure_eq("fetched tweet content", content, require_str(&body, "content")?)?;
    Ok(Pass::new("Tweet id stable across fetch"))
}

/// `GET /tweets?page=1&limit=N`
pub async fn feed_page(h: &mut Harness, limit: usize) -> bool {
    let outcome = check_feed(&h.client, "/tweets", limit).await;
    h.record("Feed Page", outcome)
}

pub async fn recommended_feed(h: &mut Harness, limit: usize) -> bool {
    let outcome = check_feed(&h.client, "/tweets/recommended", limit).await;
    h.record("Recommended Feed", outcome)
}

async fn check_feed(client: &ApiClient, path: &str, limit: usize) -> HarnessResult<Pass> {
    let request = ApiRequest::get(path)
        .query("page", "1")
        .query("limit", limit.to_string());
    let body = client.call(request, StatusPolicy::Exactly(200)).await?;

    let tweets = require_array(&body, "tweets")?;
    ensure(
        tweets.len() <= limit,
        format!("feed honours limit={}", limit),
        json!(limit),
        json!(tweets.len()),
    )?;
    ensure_eq("feed page", 1, require_u64(&body, "page")?)?;
    let has_more = require_bool(&body, "hasMore")?;

    Ok(Pass::new(format!("{} tweet(s), hasMore={}", tweets.len(), has_more)))
}

pub async fn feed_requires_auth(h: &mut Harness) -> bool {
    let outcome = check_rejected(&h.client, ApiRequest::get("/tweets").anonymous(), 401).await;
    h.record("Feed Without Token", outcome)
}

pub async fn unknown_tweet(h: &mut Harness) -> bool {
    let outcome = check_rejected(&h.client, ApiRequest::get("/tweets").segment(UNKNOWN_ID), 404).await;
    h.record("Unknown Tweet", outcome)
}

pub(crate) async fn check_rejected(client: &ApiClient, request: ApiRequest, status: u16) -> HarnessResult<Pass> {
    let response = client.send(request).await?;
    response.expect_status(StatusPolicy::Exactly(status))?;
    Ok(Pass::new(format!("Rejected with HTTP {}", status)))
}

/// A flag-plus-counter endpoint that flips on every call
#[derive(Debug)]
pub struct Toggle {
    pub name: &'static str,
    pub action: &'static str,
    pub flag: &'static str,
    pub count: &'static str,
}

pub const LIKE: Toggle = Toggle {
    name: "Like Toggle",
    action: "like",
    flag: "isLiked",
    count: "likesCount",
};

pub const RETWEET: Toggle = Toggle {
    name: "Retweet Toggle",
    action: "retweet",
    flag: "isRetweeted",
    count: "retweetsCount",
};

/// Flip twice; the flag and count must come back where they started.
pub async fn toggle_twice(h: &mut Harness, tweet_id: &str, toggle: &Toggle) -> bool {
    let outcome = check_toggle(&h.client, tweet_id, toggle).await;
    h.record(toggle.name, outcome)
}

/// Flip once. Returns the new flag and count.
pub(crate) async fn flip(client: &ApiClient, tweet_id: &str, toggle: &Toggle) -> HarnessResult<(bool, u64)> {
    let request = ApiRequest::post("/tweets").segment(tweet_id).segment(toggle.action);
    let body = client.call(request, StatusPolicy::Exactly(200)).await?;
    Ok((require_bool(&body, toggle.flag)?, require_u64(&body, toggle.count)?))
}

async fn check_toggle(client: &ApiClient, tweet_id: &str, toggle: &Toggle) -> HarnessResult<Pass> {
    let tweet = ApiRequest::get("/tweets").segment(tweet_id);
    let before = client.call(tweet.clone(), StatusPolicy::Exactly(200)).await?;
    let start = require_u64(&before, toggle.count)?;

    let (on, on_count) = flip(client, tweet_id, toggle).await?;
    ensure_eq(format!("{} after first {}", toggle.flag, toggle.action), true, on)?;
    ensure_eq(format!("{} after first {}", toggle.count, toggle.action), start + 1, on_count)?;

    let (off, off_count) = flip(client, tweet_id, toggle).await?;
    ensure_eq(format!("{} after second {}", toggle.flag, toggle.action), false, off)?;
    ensure_eq(format!("{} after second {}", toggle.count, toggle.action), start, off_count)?;

    let after = client.call(tweet, StatusPolicy::Exactly(200)).await?;
    ensure_eq(format!("{} on refetch", toggle.count), start, require_u64(&after, toggle.count)?)?;
    ensure_eq(format!("{} on refetch", toggle.flag), false, require_bool(&after, toggle.flag)?)?;

    Ok(Pass::new(format!("{} toggled on and off", toggle.action)).with_details(json!({
        toggle.count: [start, on_count, off_count],
    })))
}

/// Reply as `author`; the reply must point at its parent and be listed under it.
pub async fn reply(h: &mut Harness, parent_id: &str, author: &Principal) -> Option<String> {
    let outcome = check_reply(&h.client, parent_id, author).await;
    let id = outcome.as_ref().ok().map(|(id, _)| id.clone());
    h.record("Reply to Tweet", outcome.map(|(_, pass)| pass));
    id
}

pub(crate) async fn post_reply(client: &ApiClient, parent_id: &str, content: &str) -> HarnessResult<Value> {
    let request = ApiRequest::post("/tweets")
        .segment(parent_id)
        .segment("reply")
        .json(json!({ "content": content }));
    client.call(request, StatusPolicy::Exactly(201)).await
}

async fn check_reply(client: &ApiClient, parent_id: &str, author: &Principal) -> HarnessResult<(String, Pass)> {
    let body = post_reply(client, parent_id, "replying to hello world").await?;
    let reply_id = require_str(&body, "_id")?.to_string();
    ensure_eq("reply parentTweet", parent_id, require_ref(&body, "parentTweet")?)?;
    ensure_eq("reply author", author.id.as_str(), require_ref(&body, "author")?)?;

    let replies = client
        .send(ApiRequest::get("/tweets").segment(parent_id).segment("replies"))
        .await?;
    replies.expect_status(StatusPolicy::Exactly(200))?;
    let listed: Vec<&str> = replies
        .json_list()?
        .iter()
        .filter_map(|r| r.get("_id").and_then(Value::as_str))
        .collect();
    ensure(
        listed.contains(&reply_id.as_str()),
        "reply listed under its parent",
        json!(reply_id),
        json!(listed),
    )?;

    let fetched = client
        .call(ApiRequest::get("/tweets").segment(&reply_id), StatusPolicy::Exactly(200))
        .await?;
    ensure_eq("fetched reply id", reply_id.as_str(), require_str(&fetched, "_id")?)?;

    let pass = Pass::new(format!("Reply {} attached to {}", reply_id, parent_id));
    Ok((reply_id, pass))
}

/// Delete, then expect 404 on fetch.
pub async fn delete_tweet(h: &mut Harness, tweet_id: &str) -> bool {
    let outcome = check_delete_tweet(&h.client, tweet_id).await;
    h.record("Delete Tweet", outcome)
}

async fn check_delete_tweet(client: &ApiClient, tweet_id: &str) -> HarnessResult<Pass> {
    client
        .call(ApiRequest::delete("/tweets").segment(tweet_id), StatusPolicy::Exactly(200))
        .await?;
    check_rejected(client, ApiRequest::get("/tweets").segment(tweet_id), 404).await?;
    Ok(Pass::new("Deleted tweet is gone"))
}
