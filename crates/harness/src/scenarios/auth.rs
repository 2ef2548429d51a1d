//! Registration, login and the current-user endpoint

use serde_json::json;

use crate::client::{ApiClient, ApiRequest};
use crate::error::HarnessResult;
use crate::expect::{ensure_eq, require_str, StatusPolicy};
use crate::fixtures::Principal;
use crate::harness::Harness;
use crate::results::Pass;

pub async fn run(h: &mut Harness) {
    let Some((alice, bob)) = h.fixtures.pair() else {
        return;
    };

    login(h, &alice).await;
    current_user(h, "User A", &alice).await;
    current_user(h, "User B", &bob).await;
    current_user_requires_auth(h).await;
}

/// Register a fresh account. `None` when registration fails.
pub async fn register(h: &mut Harness, label: &str, username: &str, display_name: &str) -> Option<Principal> {
    let password = h.config().password.clone();
    let outcome = check_register(&h.client, username, display_name, &password).await;

    let principal = outcome.as_ref().ok().map(|(principal, _)| principal.clone());
    h.record(format!("Register {}", label), outcome.map(|(_, pass)| pass));
    principal
}

/// Register without recording a result. Used to seed accounts other
/// scenarios only search for.
pub(crate) async fn register_quietly(h: &Harness, username: &str, display_name: &str) -> HarnessResult<Principal> {
    let password = h.config().password.clone();
    let (principal, _) = check_register(&h.client, username, display_name, &password).await?;
    Ok(principal)
}

async fn check_register(
    client: &ApiClient,
    username: &str,
    display_name: &str,
    password: &str,
) -> HarnessResult<(Principal, Pass)> {
    let email = format!("{}@example.com", username);
    let request = ApiRequest::post("/auth/register")
        .json(json!({
            "username": username,
            "email": email,
            "password": password,
            "displayName": display_name,
        }))
        .anonymous();
    let body = client.call(request, StatusPolicy::Exactly(201)).await?;

    let principal = Principal {
        id: require_str(&body, "user._id")?.to_string(),
        username: require_str(&body, "user.username")?.to_string(),
        email,
        password: password.to_string(),
        token: require_str(&body, "token")?.to_string(),
    };

    let pass = Pass::new(format!("Registered {}", principal.username)).with_details(json!({
        "user_id": principal.id,
        "username": principal.username,
    }));
    Ok((principal, pass))
}

/// Log in with a principal's credentials; the issued token must resolve to the same user.
pub async fn login(h: &mut Harness, principal: &Principal) -> bool {
    let outcome = check_login(&h.client, principal).await;
    h.record("Login", outcome)
}

async fn check_login(client: &ApiClient, principal: &Principal) -> HarnessResult<Pass> {
    let request = ApiRequest::post("/auth/login")
        .json(json!({ "email": principal.email, "password": principal.password }))
        .anonymous();
    let body = client.call(request, StatusPolicy::Exactly(200)).await?;

    let token = require_str(&body, "token")?;
    ensure_eq("login returns the same user", principal.id.as_str(), require_str(&body, "user._id")?)?;

    let me = client
        .call(ApiRequest::get("/auth/me").bearer(token), StatusPolicy::Exactly(200))
        .await?;
    ensure_eq("login token resolves to the user", principal.id.as_str(), require_str(&me, "user._id")?)?;

    Ok(Pass::new(format!("{} logged in", principal.username)))
}

/// `GET /auth/me` with a principal's token.
pub async fn current_user(h: &mut Harness, label: &str, principal: &Principal) -> bool {
    let outcome = check_current_user(&h.client, principal).await;
    h.record(format!("{} Authentication", label), outcome)
}

async fn check_current_user(client: &ApiClient, principal: &Principal) -> HarnessResult<Pass> {
    let request = ApiRequest::get("/auth/me").bearer(principal.token.as_str());
    let body = client.call(request, StatusPolicy::Exactly(200)).await?;

    let id = require_str(&body, "user._id")?;
    let username = require_str(&body, "user.username")?;
    ensure_eq("current user id", principal.id.as_str(), id)?;
    ensure_eq("current username", principal.username.as_str(), username)?;

    Ok(Pass::new(format!("{} authenticated", username)).with_details(json!({
        "current_user_id": id,
        "current_username": username,
    })))
}

pub async fn current_user_requires_auth(h: &mut Harness) -> bool {
    let outcome = check_current_user_requires_auth(&h.client).await;
    h.record("Current User Without Token", outcome)
}

async fn check_current_user_requires_auth(client: &ApiClient) -> HarnessResult<Pass> {
    let response = client.send(ApiRequest::get("/auth/me").anonymous()).await?;
    response.expect_status(StatusPolicy::Exactly(401))?;
    Ok(Pass::new("Anonymous /auth/me rejected"))
}
