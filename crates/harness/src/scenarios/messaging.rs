//! Direct messaging between User A and User B
//!
//! The failure this suite exists for is a swapped sender/recipient pair:
//! messages that appear, from either side, as if the other person sent them.

use serde::Serialize;
use serde_json::{json, Value};

use crate::client::{ApiClient, ApiRequest};
use crate::error::{HarnessError, HarnessResult};
use crate::expect::{ensure, ensure_eq, entity_id, lookup, preview, require_ref, require_str, StatusPolicy};
use crate::fixtures::Principal;
use crate::harness::Harness;
use crate::results::Pass;

/// A message as the harness sent it
#[derive(Debug, Clone, Serialize)]
pub struct SentMessage {
    pub id: String,
    pub content: String,
    pub sender_id: String,
    pub sender_username: String,
    pub recipient_id: String,
}

pub async fn run(h: &mut Harness) {
    let Some((alice, bob)) = h.fixtures.pair() else {
        return;
    };

    let Some(conversation) = create_conversation(h, &alice, &bob).await else {
        return;
    };
    conversation_listed(h, &conversation).await;

    let mut sent = Vec::new();
    if let Some(message) = send_message(h, "User A", &alice, &bob, &conversation, "hi").await {
        sent.push(message);
    }
    if let Some(message) = send_message(h, "User B", &bob, &alice, &conversation, "hi back").await {
        sent.push(message);
    }
    if sent.is_empty() {
        return;
    }

    perspective(h, "User A", &alice, &conversation, &sent).await;
    perspective(h, "User B", &bob, &conversation, &sent).await;
}

/// The session identity opens a direct conversation with `other`.
pub async fn create_conversation(h: &mut Harness, me: &Principal, other: &Principal) -> Option<String> {
    let outcome = {
        let guard = h.client.acting_as(&me.token);
        check_create_conversation(&guard, me, other).await
    };
    let id = outcome.as_ref().ok().map(|(id, _)| id.clone());
    if let Some(id) = &id {
        h.fixtures.conversation = Some(id.clone());
    }
    h.record("Create Conversation", outcome.map(|(_, pass)| pass));
    id
}

async fn check_create_conversation(
    client: &ApiClient,
    me: &Principal,
    other: &Principal,
) -> HarnessResult<(String, Pass)> {
    let request = ApiRequest::post("/messages/conversations").json(json!({ "participantId": other.id }));
    let body = client.call(request, StatusPolicy::Exactly(201)).await?;

    let id = require_str(&body, "_id")?.to_string();
    let participants: Vec<&str> = lookup(&body, "participants")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(entity_id).collect())
        .unwrap_or_default();
    for principal in [me, other] {
        ensure(
            participants.contains(&principal.id.as_str()),
            format!("{} is a participant", principal.username),
            json!(principal.id),
            json!(participants),
        )?;
    }

    let pass = Pass::new(format!("Conversation {} created", id)).with_details(json!({
        "conversation_id": id,
        "participant_count": participants.len(),
    }));
    Ok((id, pass))
}

/// The creator's conversation listing includes the created id.
pub async fn conversation_listed(h: &mut Harness, conversation_id: &str) -> bool {
    let outcome = check_conversation_listed(&h.client, conversation_id).await;
    h.record("Conversation Listing", outcome)
}

async fn check_conversation_listed(client: &ApiClient, conversation_id: &str) -> HarnessResult<Pass> {
    let response = client.send(ApiRequest::get("/messages/conversations")).await?;
    response.expect_status(StatusPolicy::Exactly(200))?;
    let ids: Vec<&str> = response
        .json_list()?
        .iter()
        .filter_map(|c| c.get("_id").and_then(Value::as_str))
        .collect();
    ensure(
        ids.contains(&conversation_id),
        "created conversation is listed",
        json!(conversation_id),
        json!(ids),
    )?;
    Ok(Pass::new(format!("Conversation listed among {}", ids.len())))
}

/// Send as `author`; the stored sender must be the author and the recipient `other`.
pub async fn send_message(
    h: &mut Harness,
    label: &str,
    author: &Principal,
    other: &Principal,
    conversation_id: &str,
    content: &str,
) -> Option<SentMessage> {
    let outcome = {
        let guard = h.client.acting_as(&author.token);
        check_send_message(&guard, author, other, conversation_id, content).await
    };
    let sent = outcome.as_ref().ok().map(|(message, _)| message.clone());
    if let Some(message) = &sent {
        h.fixtures.messages.push(message.id.clone());
    }
    h.record(format!("Send Message {}", label), outcome.map(|(_, pass)| pass));
    sent
}

async fn check_send_message(
    client: &ApiClient,
    author: &Principal,
    other: &Principal,
    conversation_id: &str,
    content: &str,
) -> HarnessResult<(SentMessage, Pass)> {
    let request = ApiRequest::post("/messages/conversations")
        .segment(conversation_id)
        .segment("messages")
        .json(json!({ "content": content }));
    let body = client.call(request, StatusPolicy::Exactly(201)).await?;

    ensure_eq("message content echoed", content, require_str(&body, "content")?)?;
    ensure_eq("sender is the author", author.id.as_str(), require_ref(&body, "sender")?)?;
    ensure_eq("recipient is the other participant", other.id.as_str(), require_ref(&body, "recipient")?)?;

    let message = SentMessage {
        id: require_str(&body, "_id")?.to_string(),
        content: content.to_string(),
        sender_id: author.id.clone(),
        sender_username: author.username.clone(),
        recipient_id: other.id.clone(),
    };
    let pass = Pass::new(format!("{} sent {}", author.username, message.id)).with_details(json!({
        "message_id": message.id,
        "sender_username": lookup(&body, "sender.username"),
        "recipient_username": lookup(&body, "recipient.username"),
    }));
    Ok((message, pass))
}

/// Fetch the conversation as `viewer`; every sent message keeps its sender and recipient.
pub async fn perspective(
    h: &mut Harness,
    label: &str,
    viewer: &Principal,
    conversation_id: &str,
    sent: &[SentMessage],
) -> bool {
    let outcome = {
        let guard = h.client.acting_as(&viewer.token);
        check_perspective(&guard, conversation_id, sent).await
    };
    h.record(format!("Message Perspective - {}", label), outcome)
}

async fn check_perspective(client: &ApiClient, conversation_id: &str, sent: &[SentMessage]) -> HarnessResult<Pass> {
    let request = ApiRequest::get("/messages/conversations")
        .segment(conversation_id)
        .segment("messages");
    let response = client.send(request).await?;
    response.expect_status(StatusPolicy::Exactly(200))?;

    let listing = response.json_list()?;
    verify_messages(listing, sent)?;
    Ok(Pass::new(format!("{} message(s) attributed correctly", sent.len())).with_details(json!({
        "message_count": listing.len(),
    })))
}

/// Every sent message is listed with its original sender and recipient.
pub fn verify_messages(listing: &[Value], sent: &[SentMessage]) -> HarnessResult<()> {
    for message in sent {
        let listed = listing
            .iter()
            .find(|m| m.get("_id").and_then(Value::as_str) == Some(message.id.as_str()))
            .ok_or_else(|| HarnessError::Assertion {
                what: "sent message is listed".to_string(),
                expected: json!(message.id),
                actual: json!(listing.iter().map(|m| m.get("_id")).collect::<Vec<_>>()),
            })?;

        let sender = lookup(listed, "sender").and_then(entity_id);
        let recipient = lookup(listed, "recipient").and_then(entity_id);
        ensure(
            sender == Some(message.sender_id.as_str()) && recipient == Some(message.recipient_id.as_str()),
            format!("{:?} keeps its sender and recipient", preview(&message.content, 50)),
            json!({ "sender": message.sender_id, "recipient": message.recipient_id }),
            json!({ "sender": sender, "recipient": recipient }),
        )?;

        if let Some(username) = lookup(listed, "sender.username").and_then(Value::as_str) {
            ensure_eq("sender username", message.sender_username.as_str(), username)?;
        }
    }
    Ok(())
}
