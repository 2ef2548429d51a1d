//! Tweet and user search, filters and query edge cases

use serde_json::{json, Map, Value};
use std::fmt;
use tracing::warn;

use crate::client::{ApiClient, ApiRequest};
use crate::error::{HarnessError, HarnessResult};
use crate::expect::{ensure, preview, require_keys, StatusPolicy};
use crate::harness::Harness;
use crate::results::Pass;
use crate::scenarios::auth;

/// Extensions the backend's media filter treats as video
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "wmv", "flv", "webm", "mkv"];

/// Fields every tweet in a search result carries
pub const RESULT_KEYS: &[&str] = &["_id", "content", "author", "createdAt", "isLiked", "isRetweeted"];

const PAGE_LIMIT: usize = 5;

/// Tweet content and optional media URL used to seed the index
pub const SEED_TWEETS: &[(&str, Option<&str>)] = &[
    (
        "Beautiful landscape photography from my recent trip! #photography #nature #travel",
        Some("https://example.com/landscape.jpg"),
    ),
    (
        "Check out this amazing coding tutorial video! #coding #javascript #webdev #tutorial",
        Some("https://example.com/tutorial.mp4"),
    ),
    (
        "Working on my new #flutter app with amazing UI/UX design #mobiledev #design",
        Some("https://example.com/app_screenshot.png"),
    ),
    (
        "Just finished editing this promotional video for our startup! #startup #video #marketing",
        Some("https://example.com/promo.mp4"),
    ),
    (
        "Amazing sunset photo from the beach today #sunset #beach #photography",
        Some("https://example.com/sunset.jpg"),
    ),
    (
        "Learning about #ai and #machinelearning through this comprehensive course #education #tech",
        None,
    ),
    (
        "Building scalable #backend systems with Node.js and MongoDB #nodejs #database #development",
        None,
    ),
    (
        "Great discussion about #react hooks and state management #react #frontend #javascript",
        None,
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Photo,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Photo => "photo",
            MediaType::Video => "video",
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        match self {
            MediaType::Photo => !is_video_url(url),
            MediaType::Video => is_video_url(url),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_video_url(url: &str) -> bool {
    url.rsplit_once('.')
        .map(|(_, ext)| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Optional query parameters of `/tweets/search/:query`
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchFilters {
    pub sort_by: Option<&'static str>,
    pub media_type: Option<MediaType>,
    pub has_media: Option<bool>,
}

impl SearchFilters {
    fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        if let Some(sort_by) = self.sort_by {
            request = request.query("sortBy", sort_by);
        }
        if let Some(media_type) = self.media_type {
            request = request.query("mediaType", media_type.as_str());
        }
        if let Some(has_media) = self.has_media {
            request = request.query("hasMedia", has_media.to_string());
        }
        request
    }

    fn as_json(&self) -> Value {
        let mut params = Map::new();
        if let Some(sort_by) = self.sort_by {
            params.insert("sortBy".to_string(), json!(sort_by));
        }
        if let Some(media_type) = self.media_type {
            params.insert("mediaType".to_string(), json!(media_type.as_str()));
        }
        if let Some(has_media) = self.has_media {
            params.insert("hasMedia".to_string(), json!(has_media));
        }
        Value::Object(params)
    }

    /// Every result must satisfy the media constraints that were asked for.
    fn check(&self, tweets: &[Value]) -> HarnessResult<()> {
        let wants_media = self.has_media == Some(true) || self.media_type.is_some();
        if !wants_media {
            return Ok(());
        }

        for tweet in tweets {
            let url = tweet.get("imageUrl").and_then(Value::as_str).unwrap_or("");
            ensure(
                !url.is_empty(),
                "filtered result carries media",
                json!("imageUrl"),
                tweet.get("imageUrl").cloned().unwrap_or(Value::Null),
            )?;
            if let Some(media_type) = self.media_type {
                ensure(
                    media_type.matches(url),
                    format!("result media is a {}", media_type),
                    json!(media_type.as_str()),
                    json!(url),
                )?;
            }
        }
        Ok(())
    }
}

/// Filter sets exercised together
pub fn combined_filters() -> Vec<SearchFilters> {
    vec![
        SearchFilters {
            sort_by: Some("date"),
            has_media: Some(true),
            ..Default::default()
        },
        SearchFilters {
            sort_by: Some("engagement"),
            media_type: Some(MediaType::Photo),
            ..Default::default()
        },
        SearchFilters {
            media_type: Some(MediaType::Video),
            has_media: Some(true),
            ..Default::default()
        },
        SearchFilters {
            sort_by: Some("relevance"),
            media_type: Some(MediaType::Photo),
            has_media: Some(true),
        },
    ]
}

pub async fn run(h: &mut Harness) {
    let Some((alice, _)) = h.fixtures.pair() else {
        return;
    };

    let seeded = seed_tweets(h).await;

    for query in ["photography", "coding", "flutter", "startup", "javascript"] {
        basic_search(h, query, seeded).await;
    }

    for sort_by in ["date", "engagement", "relevance"] {
        let filters = SearchFilters {
            sort_by: Some(sort_by),
            ..Default::default()
        };
        filtered_search(h, &format!("Sort By - {}", sort_by), "photography", filters).await;
    }

    for media_type in [MediaType::Photo, MediaType::Video] {
        let filters = SearchFilters {
            media_type: Some(media_type),
            ..Default::default()
        };
        filtered_search(h, &format!("Media Type - {}", media_type), "tutorial", filters).await;
    }

    for has_media in [true, false] {
        let filters = SearchFilters {
            has_media: Some(has_media),
            ..Default::default()
        };
        filtered_search(h, &format!("Has Media - {}", has_media), "photography", filters).await;
    }

    for (i, filters) in combined_filters().into_iter().enumerate() {
        filtered_search(h, &format!("Combined Parameters {}", i + 1), "coding", filters).await;
    }

    for tag in ["photography", "coding", "flutter", "startup", "javascript"] {
        hashtag_search(h, tag, seeded).await;
    }

    mention_search(h, &alice.username).await;

    let developer = h.unique_name("alice_dev");
    let designer = h.unique_name("bob_designer");
    let registered = auth::register_quietly(h, &developer, "Alice Developer").await;
    if let Err(e) = auth::register_quietly(h, &designer, "Bob Designer").await {
        warn!("Could not register {}: {}", designer, e);
    }
    for query in ["alice", "bob", "dev", "designer"] {
        user_search(h, query, None).await;
    }
    match registered {
        Ok(_) => {
            user_search(h, &developer, Some(&developer)).await;
        }
        Err(e) => {
            warn!("Could not register {}, skipping its exact user search: {}", developer, e);
            h.record(format!("User Search - {}", developer), Err(e));
        }
    }

    pagination(h, "coding").await;

    for query in ["", " ", "a", "!@#$%"] {
        invalid_query(h, query).await;
    }

    data_integrity(h, "photography").await;

    let long_query = "a".repeat(100);
    for query in [
        long_query.as_str(),
        "search with spaces and special chars !@#$%^&*()",
        "unicode test 🚀 🌟 ✨",
        "query-with-dashes_and_underscores",
    ] {
        edge_case(h, query).await;
    }
}

fn search(query: &str) -> ApiRequest {
    ApiRequest::get("/tweets/search").segment(query)
}

async fn search_list(client: &ApiClient, request: ApiRequest) -> HarnessResult<Vec<Value>> {
    let response = client.send(request).await?;
    response.expect_status(StatusPolicy::Exactly(200))?;
    Ok(response.json_list()?.to_vec())
}

/// Create every seed tweet as the session identity. Returns true when all were created.
pub async fn seed_tweets(h: &mut Harness) -> bool {
    let mut created = Vec::new();
    let mut failures = Vec::new();

    for (content, image_url) in SEED_TWEETS {
        let mut body = json!({ "content": content });
        if let Some(url) = image_url {
            body["imageUrl"] = json!(url);
        }
        let request = ApiRequest::post("/tweets").json(body);
        match h.client.call(request, StatusPolicy::Exactly(201)).await {
            Ok(tweet) => match tweet.get("_id").and_then(Value::as_str) {
                Some(id) => created.push(id.to_string()),
                None => failures.push(json!({ "content": preview(content, 50), "error": "no _id" })),
            },
            Err(e) => failures.push(json!({ "content": preview(content, 50), "error": e.details() })),
        }
    }

    let outcome = if failures.is_empty() {
        Ok(Pass::new(format!("Created {} search tweets", created.len())).with_details(json!({ "tweet_ids": created })))
    } else {
        Err(HarnessError::Assertion {
            what: "every seed tweet is created".to_string(),
            expected: json!(SEED_TWEETS.len()),
            actual: json!({ "created": created.len(), "failures": failures }),
        })
    };
    h.record("Create Search Tweets", outcome)
}

/// Plain text search. With `expect_hits`, at least one result must come back.
pub async fn basic_search(h: &mut Harness, query: &str, expect_hits: bool) -> bool {
    let outcome = check_basic_search(&h.client, query, expect_hits).await;
    h.record(format!("Basic Search - {}", query), outcome)
}

async fn check_basic_search(client: &ApiClient, query: &str, expect_hits: bool) -> HarnessResult<Pass> {
    let tweets = search_list(client, search(query)).await?;
    if expect_hits {
        ensure(!tweets.is_empty(), format!("seeded tweets match {:?}", query), json!(">= 1"), json!(0))?;
    }
    Ok(Pass::new(format!("Found {} tweets", tweets.len())))
}

pub async fn filtered_search(h: &mut Harness, name: &str, query: &str, filters: SearchFilters) -> bool {
    let outcome = check_filtered_search(&h.client, query, filters).await;
    h.record(name, outcome)
}

async fn check_filtered_search(client: &ApiClient, query: &str, filters: SearchFilters) -> HarnessResult<Pass> {
    let tweets = search_list(client, filters.apply(search(query))).await?;
    filters.check(&tweets)?;
    Ok(Pass::new(format!("Retrieved {} tweets", tweets.len()))
        .with_details(json!({ "query": query, "parameters": filters.as_json(), "results_count": tweets.len() })))
}

/// True when a tweet is tagged with `tag` (no leading `#`).
pub fn carries_hashtag(tweet: &Value, tag: &str) -> bool {
    let tag = tag.to_lowercase();
    match tweet.get("hashtags").and_then(Value::as_array) {
        Some(tags) => tags.iter().filter_map(Value::as_str).any(|t| t.eq_ignore_ascii_case(&tag)),
        None => tweet
            .get("content")
            .and_then(Value::as_str)
            .map(|content| content.to_lowercase().contains(&format!("#{}", tag)))
            .unwrap_or(false),
    }
}

pub async fn hashtag_search(h: &mut Harness, tag: &str, expect_hits: bool) -> bool {
    let outcome = check_hashtag_search(&h.client, tag, expect_hits).await;
    h.record(format!("Hashtag Search - #{}", tag), outcome)
}

async fn check_hashtag_search(client: &ApiClient, tag: &str, expect_hits: bool) -> HarnessResult<Pass> {
    let tweets = search_list(client, search(&format!("#{}", tag))).await?;
    if expect_hits {
        ensure(!tweets.is_empty(), format!("seeded tweets tagged #{}", tag), json!(">= 1"), json!(0))?;
    }
    if let Some(stray) = tweets.iter().find(|t| !carries_hashtag(t, tag)) {
        return Err(HarnessError::Assertion {
            what: format!("every result is tagged #{}", tag),
            expected: json!(tag),
            actual: stray.get("content").cloned().unwrap_or(Value::Null),
        });
    }
    Ok(Pass::new(format!("Found {} tweets tagged #{}", tweets.len(), tag)))
}

pub async fn mention_search(h: &mut Harness, username: &str) -> bool {
    let outcome = async {
        let tweets = search_list(&h.client, search(&format!("@{}", username))).await?;
        Ok::<_, HarnessError>(Pass::new(format!("Found {} tweets mentioning @{}", tweets.len(), username)))
    }
    .await;
    h.record(format!("Mention Search - @{}", username), outcome)
}

/// `/users/search/:query`. With `expect`, that username must be among the results.
pub async fn user_search(h: &mut Harness, query: &str, expect: Option<&str>) -> bool {
    let outcome = check_user_search(&h.client, query, expect).await;
    h.record(format!("User Search - {}", query), outcome)
}

async fn check_user_search(client: &ApiClient, query: &str, expect: Option<&str>) -> HarnessResult<Pass> {
    let users = search_list(client, ApiRequest::get("/users/search").segment(query)).await?;
    for user in &users {
        require_keys(user, &["_id", "username"])?;
    }

    let usernames: Vec<&str> = users
        .iter()
        .filter_map(|u| u.get("username").and_then(Value::as_str))
        .collect();
    if let Some(expected) = expect {
        ensure(
            usernames.contains(&expected),
            "registered user is found by search",
            json!(expected),
            json!(usernames),
        )?;
    }

    Ok(Pass::new(format!("Found {} users", users.len())).with_details(json!({ "usernames": usernames })))
}

/// Pages 1 and 2 with `limit=5` both hold at most five results.
pub async fn pagination(h: &mut Harness, query: &str) -> bool {
    let outcome = check_pagination(&h.client, query).await;
    h.record("Pagination Test", outcome)
}

async fn check_pagination(client: &ApiClient, query: &str) -> HarnessResult<Pass> {
    let mut counts = Vec::new();
    for page in 1..=2 {
        let request = search(query)
            .query("page", page.to_string())
            .query("limit", PAGE_LIMIT.to_string());
        let tweets = search_list(client, request).await?;
        ensure(
            tweets.len() <= PAGE_LIMIT,
            format!("page {} honours limit={}", page, PAGE_LIMIT),
            json!(PAGE_LIMIT),
            json!(tweets.len()),
        )?;
        counts.push(tweets.len());
    }
    Ok(Pass::new("Pagination working correctly").with_details(json!({
        "query": query,
        "limit": PAGE_LIMIT,
        "results_per_page": counts,
    })))
}

/// Status policy for a degenerate query. The empty query leaves no path
/// segment and lands on another route, so any clean rejection is accepted
/// there; every other query must be answered with a list.
pub fn invalid_query_policy(query: &str) -> StatusPolicy {
    if query.is_empty() {
        StatusPolicy::SuccessOrRejected
    } else {
        StatusPolicy::Exactly(200)
    }
}

pub async fn invalid_query(h: &mut Harness, query: &str) -> bool {
    let outcome = check_tolerant_search(&h.client, query, invalid_query_policy(query)).await;
    h.record(format!("Invalid Query - '{}'", query), outcome)
}

/// Long, punctuated or non-ASCII queries may be rejected, but never with a 5xx.
pub async fn edge_case(h: &mut Harness, query: &str) -> bool {
    let outcome = check_tolerant_search(&h.client, query, StatusPolicy::SuccessOrRejected).await;
    h.record(format!("Edge Case - {}", preview(query, 20)), outcome)
}

async fn check_tolerant_search(client: &ApiClient, query: &str, policy: StatusPolicy) -> HarnessResult<Pass> {
    let response = client.send(search(query)).await?;
    response.expect_status(policy)?;

    let elapsed_ms = response.elapsed.as_millis() as u64;
    if !response.status.is_success() {
        return Ok(Pass::new(format!("Rejected with HTTP {}", response.status_code()))
            .with_details(json!({ "query_length": query.chars().count(), "response_time_ms": elapsed_ms })));
    }

    let results = response.json_list()?;
    Ok(Pass::new(format!("Returned {} results in {} ms", results.len(), elapsed_ms)).with_details(json!({
        "query_length": query.chars().count(),
        "results_count": results.len(),
        "response_time_ms": elapsed_ms,
    })))
}

/// Search results carry the viewer-specific flags.
pub async fn data_integrity(h: &mut Harness, query: &str) -> bool {
    let outcome = check_data_integrity(&h.client, query).await;
    h.record("Data Integrity", outcome)
}

async fn check_data_integrity(client: &ApiClient, query: &str) -> HarnessResult<Pass> {
    let tweets = search_list(client, search(query)).await?;
    match tweets.first() {
        Some(first) => {
            require_keys(first, RESULT_KEYS)?;
            Ok(Pass::new("Search results include viewer flags"))
        }
        None => Ok(Pass::new("No results to check")),
    }
}
