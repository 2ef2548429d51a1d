//! Scenario functions, one module per backend capability
//!
//! Every public scenario records at least one result on the harness and
//! returns a value for chaining (`Option`/`bool`, where `None`/`false` means
//! the scenario failed). Scenarios never propagate errors; transport and
//! shape failures end up in the recorded result's `details`.

pub mod auth;
pub mod bookmarks;
pub mod calls;
pub mod health;
pub mod lists;
pub mod messaging;
pub mod moments;
pub mod notifications;
pub mod profiles;
pub mod search;
pub mod tweets;

mod lifecycle;
