//! Entities created on the backend during a run

use serde::Serialize;

/// A registered user and the credentials to act as them
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub token: String,
}

/// Fixture handles shared between suites of one run
#[derive(Debug, Default)]
pub struct Fixtures {
    pub backend_healthy: bool,
    /// "User A": the default session identity
    pub primary: Option<Principal>,
    /// "User B": counterpart for cross-user checks
    pub secondary: Option<Principal>,
    pub conversation: Option<String>,
    pub messages: Vec<String>,
}

impl Fixtures {
    /// Both principals, when registration succeeded for both.
    pub fn pair(&self) -> Option<(Principal, Principal)> {
        match (&self.primary, &self.secondary) {
            (Some(a), Some(b)) => Some((a.clone(), b.clone())),
            _ => None,
        }
    }
}
