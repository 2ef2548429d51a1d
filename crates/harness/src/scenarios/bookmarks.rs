//! Bookmark lifecycle on a fresh tweet

use serde_json::{json, Value};

use crate::client::{ApiClient, ApiRequest};
use crate::error::HarnessResult;
use crate::expect::{ensure_eq, require_bool, require_str, StatusPolicy};
use crate::harness::Harness;
use crate::scenarios::lifecycle::{ensure_listed, Lifecycle};
use crate::scenarios::tweets;

pub async fn run(h: &mut Harness) {
    if h.fixtures.primary.is_none() {
        return;
    }
    bookmark_lifecycle(h).await;
}

pub async fn bookmark_lifecycle(h: &mut Harness) -> bool {
    let mut chain = Lifecycle::new("Bookmark");
    let outcome = drive(&h.client, &mut chain).await;
    h.record("Bookmark Lifecycle", chain.finish(outcome))
}

async fn is_bookmarked(client: &ApiClient, tweet_id: &str) -> HarnessResult<bool> {
    let body = client
        .call(
            ApiRequest::get("/bookmarks/check").segment(tweet_id),
            StatusPolicy::Exactly(200),
        )
        .await?;
    require_bool(&body, "isBookmarked")
}

async fn drive(client: &ApiClient, chain: &mut Lifecycle) -> HarnessResult<()> {
    let tweet = tweets::post_tweet(client, "Worth keeping for later").await?;
    let tweet_id = require_str(&tweet, "_id")?.to_string();
    chain.advance("tweeted", json!({ "tweet_id": tweet_id }));

    let bookmark = || ApiRequest::post("/bookmarks").segment(&tweet_id);
    let remove = || ApiRequest::delete("/bookmarks").segment(&tweet_id);

    let created = client.call(bookmark(), StatusPolicy::Exactly(201)).await?;
    let bookmark_id = created.get("bookmarkId").cloned().unwrap_or(Value::Null);
    require_str(&created, "bookmarkId")?;
    chain.advance("created", json!({ "bookmark_id": bookmark_id }));

    ensure_eq("isBookmarked after bookmarking", true, is_bookmarked(client, &tweet_id).await?)?;
    chain.advance("checked", json!({}));

    ensure_listed(client, ApiRequest::get("/bookmarks"), &tweet_id, "bookmarked tweet").await?;
    chain.advance("listed", json!({}));

    let duplicate = client.send(bookmark()).await?;
    duplicate.expect_status(StatusPolicy::Exactly(400))?;
    chain.advance("duplicate rejected", json!({}));

    client.call(remove(), StatusPolicy::Exactly(200)).await?;
    ensure_eq("isBookmarked after removal", false, is_bookmarked(client, &tweet_id).await?)?;
    chain.advance("deleted", json!({}));

    let again = client.send(remove()).await?;
    again.expect_status(StatusPolicy::Exactly(404))?;
    chain.advance("second removal rejected", json!({}));

    Ok(())
}
