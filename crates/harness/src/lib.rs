//! chirpcheck harness
//!
//! Black-box conformance checks for the Twitter-clone backend. The harness
//! issues HTTP requests against a running server, checks statuses and JSON
//! shapes, and records one result per check:
//! - Runs named suites in a fixed order against one session
//! - Switches identity through a scoped guard for cross-user checks
//! - Aggregates results into a summary and an exit code
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Harness                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  HarnessConfig ──► ApiClient                                │
//! │                      ├── send(ApiRequest) -> ApiResponse    │
//! │                      ├── call(ApiRequest, StatusPolicy)     │
//! │                      └── acting_as(token) -> IdentityGuard  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  scenarios::<suite>::run(&mut Harness)                      │
//! │    ├── health, calls, auth, tweets, profiles, search        │
//! │    ├── notifications, messaging                             │
//! │    └── lists, bookmarks, moments (gated lifecycle chains)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ResultSet                                                  │
//! │    ├── record(name, HarnessResult<Pass>)                    │
//! │    └── summary() -> Summary, exit_code()                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod expect;
pub mod fixtures;
pub mod harness;
pub mod results;
pub mod scenarios;
pub mod socketio;
pub mod suite;

pub use client::{ApiClient, ApiRequest, ApiResponse, IdentityGuard};
pub use config::HarnessConfig;
pub use error::{HarnessError, HarnessResult};
pub use expect::StatusPolicy;
pub use harness::Harness;
pub use results::{Pass, ResultSet, Summary, TestResult};
pub use suite::Suite;
