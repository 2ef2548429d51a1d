//! Result aggregation

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{error, info};

use crate::error::HarnessResult;

/// Outcome of a single check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Wall time since the previous result; checks run strictly in sequence.
    #[serde(default)]
    pub duration_ms: u64,
}

/// What a passing check reports
#[derive(Debug, Clone, Default)]
pub struct Pass {
    pub message: String,
    pub details: Option<Value>,
}

impl Pass {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Counts derived from a result set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub success_rate: f64,
}

/// Append-only, ordered record of a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSet {
    results: Vec<TestResult>,
    #[serde(skip)]
    lap: Option<Instant>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start timing the next result.
    pub fn start_clock(&mut self) {
        self.lap = Some(Instant::now());
    }

    /// Append a result and log it. Returns `result.success`.
    pub fn push(&mut self, mut result: TestResult) -> bool {
        let now = Instant::now();
        if let Some(lap) = self.lap.replace(now) {
            result.duration_ms = now.duration_since(lap).as_millis() as u64;
        }
        if result.success {
            info!("✓ {} - {}", result.name, result.message);
        } else {
            error!("✗ {} - {}", result.name, result.message);
        }
        let success = result.success;
        self.results.push(result);
        success
    }

    /// Convert a check outcome into a result. Errors become failures with details.
    pub fn record(&mut self, name: impl Into<String>, outcome: HarnessResult<Pass>) -> bool {
        let name = name.into();
        let result = match outcome {
            Ok(pass) => TestResult {
                name,
                success: true,
                message: pass.message,
                details: pass.details,
                duration_ms: 0,
            },
            Err(e) => TestResult {
                name,
                success: false,
                message: e.to_string(),
                details: Some(e.details()),
                duration_ms: 0,
            },
        };
        self.push(result)
    }

    pub fn pass(&mut self, name: impl Into<String>, message: impl Into<String>) -> bool {
        self.record(name, Ok(Pass::new(message)))
    }

    pub fn fail(&mut self, name: impl Into<String>, message: impl Into<String>, details: Option<Value>) -> bool {
        self.push(TestResult {
            name: name.into(),
            success: false,
            message: message.into(),
            details,
            duration_ms: 0,
        })
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn summary(&self) -> Summary {
        let total = self.results.len();
        let passed = self.results.iter().filter(|r| r.success).count();
        let failed = total - passed;
        let success_rate = if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64 * 100.0
        };

        Summary {
            total,
            passed,
            failed,
            success_rate,
        }
    }

    /// 0 when nothing failed, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.summary().failed == 0 {
            0
        } else {
            1
        }
    }
}
