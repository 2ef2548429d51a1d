//! Public profile endpoints under `/users/:username`

use serde_json::{json, Value};

use crate::client::{ApiClient, ApiRequest};
use crate::error::HarnessResult;
use crate::expect::{ensure, ensure_eq, require_keys, require_str, StatusPolicy};
use crate::harness::Harness;
use crate::results::Pass;
use crate::scenarios::tweets;

const PAGE_LIMIT: usize = 5;

/// Keys every tweet in a profile listing carries
pub const TWEET_KEYS: &[&str] = &["_id", "content", "author"];

pub async fn run(h: &mut Harness) {
    let Some((alice, _)) = h.fixtures.pair() else {
        return;
    };

    let content = format!("Profile check from {}", alice.username);
    let seeded = tweets::create_tweet(h, "Create Profile Tweet", &content, &alice).await;

    user_profile(h, &alice.username).await;
    user_listing(h, &alice.username, "tweets", seeded.as_deref()).await;
    user_listing(h, &alice.username, "replies", None).await;
    user_listing(h, &alice.username, "likes", None).await;

    let ghost = h.unique_name("nobody");
    unknown_user(h, &ghost).await;
}

pub async fn user_profile(h: &mut Harness, username: &str) -> bool {
    let outcome = check_user_profile(&h.client, username).await;
    h.record(format!("Get User Profile - {}", username), outcome)
}

async fn check_user_profile(client: &ApiClient, username: &str) -> HarnessResult<Pass> {
    let body = client
        .call(ApiRequest::get("/users").segment(username), StatusPolicy::Exactly(200))
        .await?;

    let user = body.get("user").unwrap_or(&Value::Null);
    require_keys(user, &["_id", "username", "displayName"])?;
    ensure_eq("profile username", username, require_str(user, "username")?)?;

    Ok(Pass::new("Profile retrieved").with_details(json!({
        "id": user["_id"],
        "displayName": user["displayName"],
        "has_profile_image": user.get("profileImage").is_some(),
        "has_bio": user.get("bio").is_some(),
    })))
}

/// `/users/:username/<listing>`: a list of at most `limit` tweets. When
/// `expected` is given, that tweet must be on the first page.
pub async fn user_listing(h: &mut Harness, username: &str, listing: &str, expected: Option<&str>) -> bool {
    let outcome = check_user_listing(&h.client, username, listing, expected).await;
    h.record(format!("Get User {} - {}", capitalise(listing), username), outcome)
}

async fn check_user_listing(
    client: &ApiClient,
    username: &str,
    listing: &str,
    expected: Option<&str>,
) -> HarnessResult<Pass> {
    let request = ApiRequest::get("/users")
        .segment(username)
        .segment(listing)
        .query("limit", PAGE_LIMIT.to_string());
    let response = client.send(request).await?;
    response.expect_status(StatusPolicy::Exactly(200))?;

    let items = response.json_list()?;
    ensure(
        items.len() <= PAGE_LIMIT,
        format!("{} honours limit={}", listing, PAGE_LIMIT),
        json!(PAGE_LIMIT),
        json!(items.len()),
    )?;
    for item in items {
        require_keys(item, TWEET_KEYS)?;
    }

    if let Some(id) = expected {
        let ids: Vec<&str> = items.iter().filter_map(|t| t.get("_id").and_then(Value::as_str)).collect();
        ensure(ids.contains(&id), format!("new tweet listed in {}", listing), json!(id), json!(ids))?;
    }

    Ok(Pass::new(format!("Retrieved {} {}", items.len(), listing)))
}

pub async fn unknown_user(h: &mut Harness, username: &str) -> bool {
    let outcome = tweets::check_rejected(&h.client, ApiRequest::get("/users").segment(username), 404).await;
    h.record("Unknown User Profile", outcome)
}

fn capitalise(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalise() {
        assert_eq!(capitalise("replies"), "Replies");
        assert_eq!(capitalise(""), "");
    }
}
