//! Moment lifecycle: create, read, update, curate tweets, delete

use serde_json::{json, Value};

use crate::client::{ApiClient, ApiRequest};
use crate::error::HarnessResult;
use crate::expect::{ensure, ensure_eq, entity_id, require_array, require_str, StatusPolicy};
use crate::harness::Harness;
use crate::scenarios::lifecycle::{ensure_gone, ensure_listed, Lifecycle};
use crate::scenarios::tweets;

/// Categories the backend accepts
pub const CATEGORIES: &[&str] = &[
    "Technology",
    "Sports",
    "Entertainment",
    "News",
    "Politics",
    "Business",
    "Health",
    "Science",
    "Other",
];

pub async fn run(h: &mut Harness) {
    if h.fixtures.primary.is_none() {
        return;
    }
    let title = format!("Harness moment {}", h.run_tag());
    moment_lifecycle(h, &title).await;
}

pub async fn moment_lifecycle(h: &mut Harness, title: &str) -> bool {
    let mut chain = Lifecycle::new("Moment");
    let outcome = drive(&h.client, &mut chain, title).await;
    h.record("Moment Lifecycle", chain.finish(outcome))
}

fn tweet_ids(moment: &Value) -> HarnessResult<Vec<String>> {
    Ok(require_array(moment, "tweets")?
        .iter()
        .filter_map(entity_id)
        .map(str::to_string)
        .collect())
}

async fn drive(client: &ApiClient, chain: &mut Lifecycle, title: &str) -> HarnessResult<()> {
    let body = client
        .call(
            ApiRequest::post("/moments").json(json!({
                "title": title,
                "description": "Collected by the conformance harness",
                "category": CATEGORIES[0],
                "hashtags": ["harness", "conformance"],
            })),
            StatusPolicy::Exactly(201),
        )
        .await?;
    let id = require_str(&body, "_id")?.to_string();
    ensure_eq("created moment title", title, require_str(&body, "title")?)?;
    ensure_eq("created moment category", CATEGORIES[0], require_str(&body, "category")?)?;
    chain.advance("created", json!({ "moment_id": id }));

    let moment = || ApiRequest::get("/moments").segment(&id);

    let fetched = client.call(moment(), StatusPolicy::Exactly(200)).await?;
    ensure_eq("fetched moment id", id.as_str(), require_str(&fetched, "_id")?)?;
    chain.advance("read", json!({}));

    ensure_listed(client, ApiRequest::get("/moments").query("limit", "50"), &id, "moment").await?;
    chain.advance("listed", json!({}));

    let retitled = format!("{} (updated)", title);
    let updated = client
        .call(
            ApiRequest::put("/moments").segment(&id).json(json!({
                "title": retitled,
                "description": "Updated by the conformance harness",
            })),
            StatusPolicy::Exactly(200),
        )
        .await?;
    ensure_eq("updated moment title", retitled.as_str(), require_str(&updated, "title")?)?;
    chain.advance("updated", json!({ "title": retitled }));

    let tweet = tweets::post_tweet(client, "A moment worth collecting").await?;
    let tweet_id = require_str(&tweet, "_id")?.to_string();
    let curated = || ApiRequest::post("/moments").segment(&id).segment("tweets").segment(&tweet_id);

    client.call(curated(), StatusPolicy::Exactly(200)).await?;
    let with_tweet = tweet_ids(&client.call(moment(), StatusPolicy::Exactly(200)).await?)?;
    ensure(
        with_tweet.contains(&tweet_id),
        "added tweet is in the moment",
        json!(tweet_id),
        json!(with_tweet),
    )?;
    chain.advance("tweet added", json!({ "tweet_id": tweet_id }));

    client
        .call(
            ApiRequest::delete("/moments").segment(&id).segment("tweets").segment(&tweet_id),
            StatusPolicy::Exactly(200),
        )
        .await?;
    let without_tweet = tweet_ids(&client.call(moment(), StatusPolicy::Exactly(200)).await?)?;
    ensure(
        !without_tweet.contains(&tweet_id),
        "removed tweet is gone from the moment",
        json!([]),
        json!(without_tweet),
    )?;
    chain.advance("tweet removed", json!({}));

    client
        .call(ApiRequest::delete("/moments").segment(&id), StatusPolicy::Exactly(200))
        .await?;
    ensure_gone(client, moment()).await?;
    chain.advance("deleted", json!({}));

    Ok(())
}
