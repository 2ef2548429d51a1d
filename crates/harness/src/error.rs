//! Error types for conformance runs

use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Request {method} {url} failed: {source}")]
    Transport {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request {method} {url} timed out after {seconds}s")]
    Timeout {
        method: String,
        url: String,
        seconds: u64,
    },

    #[error("Expected {expected}, got HTTP {actual}")]
    UnexpectedStatus {
        expected: String,
        actual: u16,
        body: Value,
    },

    #[error("Missing or mistyped field `{field}` (expected {expected})")]
    MissingField {
        field: String,
        expected: &'static str,
        body: Value,
    },

    #[error("Assertion failed: {what}")]
    Assertion {
        what: String,
        expected: Value,
        actual: Value,
    },

    #[error("Aborted after `{reached}`: {source}")]
    Aborted {
        reached: &'static str,
        completed: Vec<Value>,
        #[source]
        source: Box<HarnessError>,
    },

    #[error("Setup aborted: {0}")]
    SetupAborted(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;

impl HarnessError {
    /// Structured payload stored alongside a failing result.
    pub fn details(&self) -> Value {
        match self {
            HarnessError::Transport { method, url, source } => json!({
                "kind": "transport",
                "method": method,
                "url": url,
                "connect": source.is_connect(),
                "error": source.to_string(),
            }),
            HarnessError::Timeout { method, url, seconds } => json!({
                "kind": "timeout",
                "method": method,
                "url": url,
                "timeout_secs": seconds,
            }),
            HarnessError::UnexpectedStatus { expected, actual, body } => json!({
                "kind": "unexpected_status",
                "expected": expected,
                "actual": actual,
                "body": body,
            }),
            HarnessError::MissingField { field, expected, body } => json!({
                "kind": "missing_field",
                "field": field,
                "expected": expected,
                "body": body,
            }),
            HarnessError::Assertion { what, expected, actual } => json!({
                "kind": "assertion",
                "what": what,
                "expected": expected,
                "actual": actual,
            }),
            HarnessError::Aborted { reached, completed, source } => json!({
                "kind": "aborted",
                "reached": reached,
                "completed": completed,
                "cause": source.details(),
            }),
            other => json!({ "kind": "internal", "error": other.to_string() }),
        }
    }

    /// True when the backend could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, HarnessError::Transport { .. } | HarnessError::Timeout { .. })
    }
}
