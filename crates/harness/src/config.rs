//! Harness configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{HarnessError, HarnessResult};

/// Backend the harness talks to when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Prefix every API route lives under
pub const DEFAULT_API_PREFIX: &str = "/api";

/// Per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Password used for every principal the harness registers
pub const DEFAULT_PASSWORD: &str = "password123";

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Server root, without the API prefix
    pub base_url: String,

    /// Path prefix for API routes
    pub api_prefix: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Password for registered principals
    pub password: String,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// How long to poll `/health` before the first scenario (0 = single attempt)
    pub wait_for_backend_secs: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            password: DEFAULT_PASSWORD.to_string(),
            user_agent: format!("chirpcheck/{}", env!("CARGO_PKG_VERSION")),
            wait_for_backend_secs: 0,
        }
    }
}

impl HarnessConfig {
    /// Load a TOML file; absent keys keep their defaults.
    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> HarnessResult<Self> {
        let config: HarnessConfig = toml::from_str(raw)?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn wait_for_backend(&self) -> Duration {
        Duration::from_secs(self.wait_for_backend_secs)
    }

    /// Reject configurations that cannot produce a working client.
    pub fn validate(&self) -> HarnessResult<()> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| HarnessError::Config(format!("base_url {:?}: {}", self.base_url, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(HarnessError::Config(format!(
                "base_url must be http or https, got {}",
                url.scheme()
            )));
        }

        if !self.api_prefix.is_empty() && !self.api_prefix.starts_with('/') {
            return Err(HarnessError::Config(format!(
                "api_prefix must start with '/', got {:?}",
                self.api_prefix
            )));
        }

        if self.timeout_secs == 0 {
            return Err(HarnessError::Config("timeout_secs must be at least 1".to_string()));
        }

        if self.password.len() < 6 {
            return Err(HarnessError::Config(
                "password must be at least 6 characters".to_string(),
            ));
        }

        Ok(())
    }
}
