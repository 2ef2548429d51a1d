//! Cross-user notification attribution and read state
//!
//! User B posts a tweet; User A likes, retweets and replies to it and
//! mentions B in a tweet of their own. B's inbox must then hold one entry
//! per action, addressed to B and originating from A, while A's inbox holds
//! nothing A caused.

use serde_json::{json, Value};

use crate::client::{ApiClient, ApiRequest};
use crate::error::{HarnessError, HarnessResult};
use crate::expect::{ensure, ensure_eq, entity_id, lookup, require_bool, require_str, StatusPolicy};
use crate::fixtures::Principal;
use crate::harness::Harness;
use crate::results::Pass;
use crate::scenarios::tweets::{self, LIKE, RETWEET};

/// Actions A takes on B's tweet, with the verb used in result names
const ACTIONS: &[(&str, &str)] = &[("like", "likes"), ("retweet", "retweets"), ("reply", "replies to")];

/// A notification B should have received, and the tweet it refers to
#[derive(Debug, Clone)]
pub struct Expected {
    pub kind: &'static str,
    pub tweet_id: String,
}

pub async fn run(h: &mut Harness) {
    let Some((alice, bob)) = h.fixtures.pair() else {
        return;
    };

    let Some(bob_tweet) = create_as(h, &bob, "Create Tweet as User B", "Notification target from User B").await else {
        return;
    };

    let mut expected = Vec::new();
    for &(kind, verb) in ACTIONS {
        if act(h, kind, verb, &bob_tweet).await.is_some() {
            expected.push(Expected {
                kind,
                tweet_id: bob_tweet.clone(),
            });
        }
    }
    let mention = format!("Hey @{} check this out", bob.username);
    if let Some(mention_tweet) = tweets::create_tweet(h, "Mention User B", &mention, &alice).await {
        expected.push(Expected {
            kind: "mention",
            tweet_id: mention_tweet,
        });
    }

    let mut matched = Vec::new();
    for exp in &expected {
        if let Some(id) = attributed(h, &alice, &bob, exp).await {
            matched.push(id);
        }
    }

    no_self_notification(h, &alice).await;

    if let Some(first) = matched.first() {
        mark_one_read(h, &bob, first).await;
    }
    mark_all_read(h, &bob, &alice).await;
}

/// Post a tweet as `author`, restoring the session identity afterwards.
pub async fn create_as(h: &mut Harness, author: &Principal, name: &str, content: &str) -> Option<String> {
    let outcome = {
        let guard = h.client.acting_as(&author.token);
        tweets::post_tweet(&guard, content).await
    };
    let outcome = outcome.and_then(|body| {
        let id = require_str(&body, "_id")?.to_string();
        Ok((id.clone(), Pass::new(format!("Tweet {} created by {}", id, author.username))))
    });

    let id = outcome.as_ref().ok().map(|(id, _)| id.clone());
    h.record(name, outcome.map(|(_, pass)| pass));
    id
}

/// One notification-producing action by the session identity on `tweet_id`.
async fn act(h: &mut Harness, action: &str, verb: &str, tweet_id: &str) -> Option<()> {
    let outcome = check_act(&h.client, action, tweet_id).await;
    h.record(format!("User A {} User B's Tweet", verb), outcome)
        .then_some(())
}

async fn check_act(client: &ApiClient, action: &str, tweet_id: &str) -> HarnessResult<Pass> {
    match action {
        "like" | "retweet" => {
            let toggle = if action == "like" { &LIKE } else { &RETWEET };
            let (on, _) = tweets::flip(client, tweet_id, toggle).await?;
            ensure_eq(format!("{} is set", toggle.flag), true, on)?;
        }
        _ => {
            tweets::post_reply(client, tweet_id, "Replying for the notification check").await?;
        }
    }
    Ok(Pass::new(format!("{} sent", action)))
}

/// B's inbox holds a `kind` notification for the tweet, addressed to B and from A.
/// Returns the notification id.
pub async fn attributed(h: &mut Harness, alice: &Principal, bob: &Principal, expected: &Expected) -> Option<String> {
    let outcome = {
        let guard = h.client.acting_as(&bob.token);
        check_attributed(&guard, alice, bob, expected).await
    };
    let id = outcome.as_ref().ok().map(|(id, _)| id.clone());
    h.record(format!("Notification - {}", expected.kind), outcome.map(|(_, pass)| pass));
    id
}

async fn inbox(client: &ApiClient) -> HarnessResult<Vec<Value>> {
    fetch_inbox(client, ApiRequest::get("/notifications")).await
}

async fn fetch_inbox(client: &ApiClient, request: ApiRequest) -> HarnessResult<Vec<Value>> {
    let response = client.send(request).await?;
    response.expect_status(StatusPolicy::Exactly(200))?;
    Ok(response.json_list()?.to_vec())
}

fn summarise(notifications: &[Value]) -> Value {
    notifications
        .iter()
        .map(|n| {
            json!({
                "type": n.get("type"),
                "from": n.get("fromUserId").and_then(entity_id),
                "tweet": n.get("tweetId").and_then(entity_id),
            })
        })
        .collect()
}

/// Locate the notification for `expected` and check who it came from and who it is for.
pub fn find_attributed<'a>(
    notifications: &'a [Value],
    expected: &Expected,
    from: &str,
    to: &str,
) -> HarnessResult<&'a Value> {
    let found = notifications.iter().find(|n| {
        n.get("type").and_then(Value::as_str) == Some(expected.kind)
            && n.get("tweetId").and_then(entity_id) == Some(expected.tweet_id.as_str())
    });

    let notification = found.ok_or_else(|| HarnessError::Assertion {
        what: format!("recipient has a {} notification for the tweet", expected.kind),
        expected: json!({ "type": expected.kind, "tweetId": expected.tweet_id }),
        actual: summarise(notifications),
    })?;

    let origin = lookup(notification, "fromUserId").and_then(entity_id);
    ensure(
        origin == Some(from),
        format!("{} notification comes from the actor", expected.kind),
        json!(from),
        json!(origin),
    )?;

    if let Some(recipient) = lookup(notification, "userId").and_then(entity_id) {
        ensure_eq(format!("{} notification is addressed to the author", expected.kind), to, recipient)?;
    }

    Ok(notification)
}

async fn check_attributed(
    client: &ApiClient,
    alice: &Principal,
    bob: &Principal,
    expected: &Expected,
) -> HarnessResult<(String, Pass)> {
    let notifications = inbox(client).await?;
    let notification = find_attributed(&notifications, expected, &alice.id, &bob.id)?;
    let id = require_str(notification, "_id")?.to_string();

    let pass = Pass::new(format!("{} received a {} from {}", bob.username, expected.kind, alice.username))
        .with_details(json!({
            "notification_id": id,
            "from": lookup(notification, "fromUserId.username"),
        }));
    Ok((id, pass))
}

/// The actor's own inbox holds nothing the actor caused.
pub async fn no_self_notification(h: &mut Harness, actor: &Principal) -> bool {
    let outcome = check_no_self_notification(&h.client, actor).await;
    h.record("No Self-Notification", outcome)
}

async fn check_no_self_notification(client: &ApiClient, actor: &Principal) -> HarnessResult<Pass> {
    let notifications = inbox(client).await?;
    let own: Vec<&Value> = notifications
        .iter()
        .filter(|n| lookup(n, "fromUserId").and_then(entity_id) == Some(actor.id.as_str()))
        .collect();
    ensure(own.is_empty(), "no notification from oneself", json!([]), json!(own))?;
    Ok(Pass::new(format!("{} has no self-notifications", actor.username)))
}

/// Mark a single notification read; every other entry keeps its state.
pub async fn mark_one_read(h: &mut Harness, owner: &Principal, notification_id: &str) -> bool {
    let outcome = {
        let guard = h.client.acting_as(&owner.token);
        check_mark_one_read(&guard, notification_id).await
    };
    h.record("Mark Notification Read", outcome)
}

fn read_states(notifications: &[Value]) -> HarnessResult<Vec<(String, bool)>> {
    notifications
        .iter()
        .map(|n| Ok((require_str(n, "_id")?.to_string(), require_bool(n, "isRead")?)))
        .collect()
}

/// Ids present in both snapshots whose read state changed, other than `except`.
fn flipped<'a>(before: &[(String, bool)], after: &'a [(String, bool)], except: Option<&str>) -> Vec<&'a str> {
    after
        .iter()
        .filter(|(id, _)| Some(id.as_str()) != except)
        .filter(|(id, read)| before.iter().any(|(other, was)| other == id && was != read))
        .map(|(id, _)| id.as_str())
        .collect()
}

async fn check_mark_one_read(client: &ApiClient, notification_id: &str) -> HarnessResult<Pass> {
    let before = read_states(&inbox(client).await?)?;
    let was_read = before
        .iter()
        .find(|(id, _)| id == notification_id)
        .map(|(_, read)| *read);
    ensure_eq("notification unread before marking", Some(false), was_read)?;

    let request = ApiRequest::patch("/notifications").segment(notification_id).segment("read");
    client.call(request, StatusPolicy::Exactly(200)).await?;

    let after = read_states(&inbox(client).await?)?;
    let now_read = after
        .iter()
        .find(|(id, _)| id == notification_id)
        .map(|(_, read)| *read);
    ensure_eq("marked notification isRead", Some(true), now_read)?;

    let others = flipped(&before, &after, Some(notification_id));
    ensure(others.is_empty(), "other notifications untouched", json!([]), json!(others))?;

    Ok(Pass::new(format!("Notification {} marked read", notification_id)))
}

/// After read-all every entry in the owner's inbox is read, and the
/// bystander's inbox is unchanged.
pub async fn mark_all_read(h: &mut Harness, owner: &Principal, bystander: &Principal) -> bool {
    let outcome = {
        let guard = h.client.acting_as(&owner.token);
        check_mark_all_read(&guard, bystander).await
    };
    h.record("Mark All Notifications Read", outcome)
}

async fn check_mark_all_read(client: &ApiClient, bystander: &Principal) -> HarnessResult<Pass> {
    let bystander_inbox = ApiRequest::get("/notifications").bearer(&bystander.token);
    let untouched = read_states(&fetch_inbox(client, bystander_inbox.clone()).await?)?;

    client
        .call(ApiRequest::patch("/notifications/read-all"), StatusPolicy::Exactly(200))
        .await?;

    let states = read_states(&inbox(client).await?)?;
    let unread: Vec<&str> = states
        .iter()
        .filter(|(_, read)| !read)
        .map(|(id, _)| id.as_str())
        .collect();
    ensure(unread.is_empty(), "every notification isRead", json!([]), json!(unread))?;

    let after = read_states(&fetch_inbox(client, bystander_inbox).await?)?;
    let leaked = flipped(&untouched, &after, None);
    ensure(
        leaked.is_empty(),
        format!("{}'s notifications untouched by read-all", bystander.username),
        json!([]),
        json!(leaked),
    )?;

    Ok(Pass::new(format!("All {} notifications read", states.len())))
}
