//! Gated multi-step chains (create → read → update → ... → delete)

use serde_json::{json, Value};

use crate::client::{ApiClient, ApiRequest};
use crate::error::{HarnessError, HarnessResult};
use crate::expect::{ensure, StatusPolicy};
use crate::results::Pass;

/// Tracks how far a chain got. A failed step turns the whole chain into
/// one failing result naming the last stage reached.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    entity: &'static str,
    reached: &'static str,
    completed: Vec<Value>,
}

impl Lifecycle {
    pub(crate) fn new(entity: &'static str) -> Self {
        Self {
            entity,
            reached: "start",
            completed: Vec::new(),
        }
    }

    pub(crate) fn advance(&mut self, stage: &'static str, details: Value) {
        self.reached = stage;
        self.completed.push(json!({ "stage": stage, "details": details }));
    }

    pub(crate) fn finish(self, outcome: HarnessResult<()>) -> HarnessResult<Pass> {
        match outcome {
            Ok(()) => {
                let stages: Vec<&str> = self
                    .completed
                    .iter()
                    .filter_map(|step| step["stage"].as_str())
                    .collect();
                let message = format!("{} lifecycle completed: {}", self.entity, stages.join(" → "));
                Ok(Pass::new(message).with_details(Value::Array(self.completed)))
            }
            Err(e) => Err(HarnessError::Aborted {
                reached: self.reached,
                completed: self.completed,
                source: Box::new(e),
            }),
        }
    }
}

/// The listing behind `request` (a JSON list) includes an entry with `_id == id`.
pub(crate) async fn ensure_listed(client: &ApiClient, request: ApiRequest, id: &str, what: &str) -> HarnessResult<()> {
    let response = client.send(request).await?;
    response.expect_status(StatusPolicy::Exactly(200))?;
    let ids: Vec<&str> = response
        .json_list()?
        .iter()
        .filter_map(|item| item.get("_id").and_then(Value::as_str))
        .collect();
    ensure(ids.contains(&id), format!("{} is listed", what), json!(id), json!(ids))
}

/// Fetching `request` now answers 404.
pub(crate) async fn ensure_gone(client: &ApiClient, request: ApiRequest) -> HarnessResult<()> {
    let response = client.send(request).await?;
    response.expect_status(StatusPolicy::Exactly(404))
}
