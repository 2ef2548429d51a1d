//! Backend liveness

use serde_json::json;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::client::{ApiClient, ApiRequest};
use crate::error::{HarnessError, HarnessResult};
use crate::expect::{ensure, require_str, StatusPolicy};
use crate::harness::Harness;
use crate::results::Pass;

/// Substring the health endpoint's `message` must carry
pub const HEALTH_BANNER: &str = "Twitter Clone Backend API is running";

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// `GET /health`. Returns false when the backend is down or misbehaving.
pub async fn server_health(h: &mut Harness) -> bool {
    let outcome = check_health(&h.client).await;
    h.record("Server Health Check", outcome)
}

async fn check_health(client: &ApiClient) -> HarnessResult<Pass> {
    let body = client.call(ApiRequest::get("/health"), StatusPolicy::Exactly(200)).await?;

    let status = require_str(&body, "status")?;
    ensure(status == "OK", "health status is OK", json!("OK"), json!(status))?;

    let message = require_str(&body, "message")?;
    ensure(
        message.contains(HEALTH_BANNER),
        "health message names the API",
        json!(HEALTH_BANNER),
        json!(message),
    )?;

    Ok(Pass::new("Server is running properly").with_details(body))
}

/// Poll `/health` until it answers 2xx or `within` elapses. Returns the
/// number of attempts it took.
pub async fn wait_until_reachable(client: &ApiClient, within: Duration) -> HarnessResult<usize> {
    let start = Instant::now();
    let mut attempts = 0;

    while start.elapsed() < within {
        attempts += 1;

        match client.send(ApiRequest::get("/health")).await {
            Ok(resp) if resp.status.is_success() => {
                info!("Backend reachable after {} attempt(s)", attempts);
                return Ok(attempts);
            }
            Ok(resp) => {
                warn!("Health check returned {}", resp.status);
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for backend at {}...", client.base_url());
                }
                if !e.is_transport() {
                    warn!("Health check error: {}", e);
                }
            }
        }

        sleep(POLL_INTERVAL).await;
    }

    Err(HarnessError::SetupAborted(format!(
        "backend at {} not reachable after {} attempts",
        client.base_url(),
        attempts
    )))
}
