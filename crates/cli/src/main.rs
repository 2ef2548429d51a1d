//! chirpcheck - API conformance runner
//!
//! Runs one suite (or all of them) against a live backend and exits 0 when
//! every check passed, 1 when any failed or setup aborted, 2 on bad config.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

use chirpcheck_harness::{Harness, HarnessConfig, HarnessError, Suite};

mod output;

/// chirpcheck - black-box conformance checks for the Twitter-clone API
#[derive(Parser)]
#[command(name = "chirpcheck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Suite to run
    #[arg(value_enum, default_value = "all")]
    suite: Suite,

    /// Backend root URL, without the API prefix
    #[arg(long, env = "CHIRPCHECK_BASE_URL")]
    base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "CHIRPCHECK_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// TOML configuration file
    #[arg(long, env = "CHIRPCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Poll /health for up to this many seconds before starting
    #[arg(long)]
    wait_for_backend: Option<u64>,

    /// Output format
    #[arg(long, default_value = "table")]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Flags and environment override the file, the file overrides defaults.
    fn resolve_config(&self) -> anyhow::Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_file(path)
                .with_context(|| format!("reading {}", path.display()))?,
            None => HarnessConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
        if let Some(wait) = self.wait_for_backend {
            config.wait_for_backend_secs = wait;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            std::process::exit(2);
        }
    };
    debug!("Configuration: {:?}", config);

    let mut harness = match Harness::new(config) {
        Ok(harness) => harness,
        Err(e) => {
            output::print_error(&e.to_string());
            std::process::exit(2);
        }
    };

    println!("🚀 Running `{}` against {}", cli.suite, harness.config().base_url);
    let outcome = harness.run(cli.suite).await;

    output::print_report(harness.results(), cli.format);

    match outcome {
        Ok(()) => std::process::exit(harness.results().exit_code()),
        Err(e @ HarnessError::SetupAborted(_)) => {
            output::print_warning(&e.to_string());
            std::process::exit(1);
        }
        Err(e) => {
            output::print_error(&e.to_string());
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "chirpcheck",
            "tweets",
            "--base-url",
            "http://127.0.0.1:4000",
            "--timeout-secs",
            "3",
        ]);
        assert_eq!(cli.suite, Suite::Tweets);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:4000");
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.api_prefix, "/api");
    }

    #[test]
    fn test_rejects_invalid_config() {
        let cli = Cli::parse_from(["chirpcheck", "--base-url", "not a url"]);
        assert_eq!(cli.suite, Suite::All);
        assert!(cli.resolve_config().is_err());
    }
}
