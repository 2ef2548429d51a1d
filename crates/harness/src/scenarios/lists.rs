//! List lifecycle: create, read, update, pin, delete

use serde_json::json;

use crate::client::{ApiClient, ApiRequest};
use crate::error::HarnessResult;
use crate::expect::{ensure_eq, require_bool, require_str, StatusPolicy};
use crate::harness::Harness;
use crate::scenarios::lifecycle::{ensure_gone, ensure_listed, Lifecycle};

/// Backend limit on list names
pub const MAX_NAME_CHARS: usize = 25;

pub async fn run(h: &mut Harness) {
    if h.fixtures.primary.is_none() {
        return;
    }
    let suffix = short_tag(h.run_tag());
    list_lifecycle(h, &format!("Reading {}", suffix), &format!("Reading v2 {}", suffix)).await;
}

/// Trailing characters of the run tag, short enough for a list name.
pub fn short_tag(tag: &str) -> String {
    let chars: Vec<char> = tag.chars().collect();
    chars[chars.len().saturating_sub(8)..].iter().collect()
}

pub async fn list_lifecycle(h: &mut Harness, name: &str, renamed: &str) -> bool {
    let mut chain = Lifecycle::new("List");
    let outcome = drive(&h.client, &mut chain, name, renamed).await;
    h.record("List Lifecycle", chain.finish(outcome))
}

async fn drive(client: &ApiClient, chain: &mut Lifecycle, name: &str, renamed: &str) -> HarnessResult<()> {
    let body = client
        .call(
            ApiRequest::post("/lists").json(json!({
                "name": name,
                "description": "Created by the conformance harness",
                "isPrivate": false,
            })),
            StatusPolicy::Exactly(201),
        )
        .await?;
    let id = require_str(&body, "_id")?.to_string();
    ensure_eq("created list name", name, require_str(&body, "name")?)?;
    chain.advance("created", json!({ "list_id": id }));

    let list = || ApiRequest::get("/lists").segment(&id);

    let fetched = client.call(list(), StatusPolicy::Exactly(200)).await?;
    ensure_eq("fetched list id", id.as_str(), require_str(&fetched, "_id")?)?;
    chain.advance("read", json!({ "name": fetched["name"] }));

    ensure_listed(client, ApiRequest::get("/lists"), &id, "list").await?;
    chain.advance("listed", json!({}));

    let updated = client
        .call(
            ApiRequest::put("/lists").segment(&id).json(json!({
                "name": renamed,
                "description": "Updated by the conformance harness",
            })),
            StatusPolicy::Exactly(200),
        )
        .await?;
    ensure_eq("updated list name", renamed, require_str(&updated, "name")?)?;
    chain.advance("updated", json!({ "name": renamed }));

    let pin = || ApiRequest::post("/lists").segment(&id).segment("pin");
    let pinned = client.call(pin(), StatusPolicy::Exactly(200)).await?;
    ensure_eq("isPinned after pin", true, require_bool(&pinned, "isPinned")?)?;
    ensure_listed(client, ApiRequest::get("/lists").query("type", "pinned"), &id, "pinned list").await?;
    chain.advance("pinned", json!({}));

    let unpinned = client.call(pin(), StatusPolicy::Exactly(200)).await?;
    ensure_eq("isPinned after second pin", false, require_bool(&unpinned, "isPinned")?)?;
    chain.advance("unpinned", json!({}));

    client
        .call(ApiRequest::delete("/lists").segment(&id), StatusPolicy::Exactly(200))
        .await?;
    ensure_gone(client, list()).await?;
    chain.advance("deleted", json!({}));

    Ok(())
}
