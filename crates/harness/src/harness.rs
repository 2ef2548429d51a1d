//! Harness that owns the session, fixtures and results of one run

use chrono::Utc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::client::ApiClient;
use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::fixtures::Fixtures;
use crate::results::{Pass, ResultSet, Summary};
use crate::scenarios;
use crate::suite::Suite;

/// One conformance run against one backend
pub struct Harness {
    pub(crate) client: ApiClient,
    pub(crate) fixtures: Fixtures,
    results: ResultSet,
    config: HarnessConfig,
    run_tag: String,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> HarnessResult<Self> {
        let client = ApiClient::new(&config)?;
        Ok(Self {
            client,
            fixtures: Fixtures::default(),
            results: ResultSet::new(),
            config,
            run_tag: Utc::now().timestamp_millis().to_string(),
        })
    }

    /// Override the suffix used to make usernames and emails unique.
    pub fn with_run_tag(mut self, tag: impl Into<String>) -> Self {
        self.run_tag = tag.into();
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn fixtures(&self) -> &Fixtures {
        &self.fixtures
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn into_results(self) -> ResultSet {
        self.results
    }

    pub fn summary(&self) -> Summary {
        self.results.summary()
    }

    pub fn run_tag(&self) -> &str {
        &self.run_tag
    }

    /// `<stem>_<run tag>`, lowercase, for fixture names
    pub fn unique_name(&self, stem: &str) -> String {
        format!("{}_{}", stem, self.run_tag).to_lowercase()
    }

    pub fn record(&mut self, name: impl Into<String>, outcome: HarnessResult<Pass>) -> bool {
        self.results.record(name, outcome)
    }

    /// Run a suite. Only setup-critical failures come back as `Err`;
    /// everything else is recorded as a result.
    pub async fn run(&mut self, suite: Suite) -> HarnessResult<()> {
        let start = Instant::now();
        self.results.start_clock();

        self.ensure_backend().await?;

        let order = match suite {
            Suite::All => Suite::ORDER.to_vec(),
            single => vec![single],
        };

        for suite in order {
            self.run_one(suite).await?;
        }

        let summary = self.summary();
        info!(
            "Results: {} passed, {} failed ({} ms)",
            summary.passed,
            summary.failed,
            start.elapsed().as_millis()
        );
        Ok(())
    }

    async fn run_one(&mut self, suite: Suite) -> HarnessResult<()> {
        info!("▶ {} suite", suite);

        if suite.needs_principals() {
            self.ensure_principals().await?;
        }

        match suite {
            Suite::All => unreachable!("expanded by run()"),
            Suite::Calls => scenarios::calls::run(self).await,
            Suite::Auth => scenarios::auth::run(self).await,
            Suite::Tweets => scenarios::tweets::run(self).await,
            Suite::Profiles => scenarios::profiles::run(self).await,
            Suite::Search => scenarios::search::run(self).await,
            Suite::Notifications => scenarios::notifications::run(self).await,
            Suite::Messaging => scenarios::messaging::run(self).await,
            Suite::Lists => scenarios::lists::run(self).await,
            Suite::Bookmarks => scenarios::bookmarks::run(self).await,
            Suite::Moments => scenarios::moments::run(self).await,
        }

        Ok(())
    }

    /// Health check, once per run. Aborts the run if the backend is down.
    async fn ensure_backend(&mut self) -> HarnessResult<()> {
        if self.fixtures.backend_healthy {
            return Ok(());
        }

        let wait = self.config.wait_for_backend();
        if !wait.is_zero() {
            if let Err(e) = scenarios::health::wait_until_reachable(&self.client, wait).await {
                warn!("{}", e);
            }
        }

        if !scenarios::health::server_health(self).await {
            error!("Server is not running. Stopping tests.");
            return Err(HarnessError::SetupAborted(format!(
                "backend at {} failed its health check",
                self.client.base_url()
            )));
        }

        self.fixtures.backend_healthy = true;
        Ok(())
    }

    /// Register "User A" and "User B", once per run. The session acts as A afterwards.
    async fn ensure_principals(&mut self) -> HarnessResult<()> {
        if self.fixtures.primary.is_none() {
            let stem = self.unique_name("alice");
            let principal = scenarios::auth::register(self, "User A", &stem, "Alice")
                .await
                .ok_or_else(|| HarnessError::SetupAborted("failed to register User A".to_string()))?;
            self.client.set_token(Some(principal.token.clone()));
            self.fixtures.primary = Some(principal);
        }

        if self.fixtures.secondary.is_none() {
            let stem = self.unique_name("bob");
            let principal = scenarios::auth::register(self, "User B", &stem, "Bob")
                .await
                .ok_or_else(|| HarnessError::SetupAborted("failed to register User B".to_string()))?;
            self.fixtures.secondary = Some(principal);
        }

        Ok(())
    }
}
