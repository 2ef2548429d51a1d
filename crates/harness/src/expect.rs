//! Status policies and JSON shape checks used by scenarios

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

use crate::error::{HarnessError, HarnessResult};

/// Which HTTP statuses count as the expected outcome of a call.
///
/// Every scenario names its policy explicitly; nothing is inferred from
/// the response itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Exactly this status
    Exactly(u16),
    /// Any of these statuses
    OneOf(&'static [u16]),
    /// Any 2xx
    Success,
    /// Any 2xx, or a 4xx rejection of the input. 5xx always fails.
    SuccessOrRejected,
}

impl StatusPolicy {
    pub fn accepts(&self, status: u16) -> bool {
        match self {
            StatusPolicy::Exactly(expected) => status == *expected,
            StatusPolicy::OneOf(allowed) => allowed.contains(&status),
            StatusPolicy::Success => (200..300).contains(&status),
            StatusPolicy::SuccessOrRejected => (200..500).contains(&status) && !(300..400).contains(&status),
        }
    }
}

impl fmt::Display for StatusPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusPolicy::Exactly(status) => write!(f, "HTTP {}", status),
            StatusPolicy::OneOf(allowed) => {
                let list: Vec<String> = allowed.iter().map(u16::to_string).collect();
                write!(f, "HTTP {}", list.join("/"))
            }
            StatusPolicy::Success => write!(f, "HTTP 2xx"),
            StatusPolicy::SuccessOrRejected => write!(f, "HTTP 2xx or 4xx"),
        }
    }
}

/// Look up a dotted path (`user._id`, `tweets.0.author`) inside a JSON value.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn missing(value: &Value, path: &str, expected: &'static str) -> HarnessError {
    HarnessError::MissingField {
        field: path.to_string(),
        expected,
        body: value.clone(),
    }
}

pub fn require<'a>(value: &'a Value, path: &str) -> HarnessResult<&'a Value> {
    lookup(value, path)
        .filter(|v| !v.is_null())
        .ok_or_else(|| missing(value, path, "a value"))
}

pub fn require_str<'a>(value: &'a Value, path: &str) -> HarnessResult<&'a str> {
    lookup(value, path)
        .and_then(Value::as_str)
        .ok_or_else(|| missing(value, path, "a string"))
}

pub fn require_bool(value: &Value, path: &str) -> HarnessResult<bool> {
    lookup(value, path)
        .and_then(Value::as_bool)
        .ok_or_else(|| missing(value, path, "a boolean"))
}

pub fn require_u64(value: &Value, path: &str) -> HarnessResult<u64> {
    lookup(value, path)
        .and_then(Value::as_u64)
        .ok_or_else(|| missing(value, path, "a non-negative integer"))
}

pub fn require_array<'a>(value: &'a Value, path: &str) -> HarnessResult<&'a [Value]> {
    lookup(value, path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| missing(value, path, "a list"))
}

/// Require every listed key to be present on an object.
pub fn require_keys(value: &Value, keys: &[&str]) -> HarnessResult<()> {
    let absent: Vec<&str> = keys
        .iter()
        .copied()
        .filter(|key| value.get(key).is_none())
        .collect();

    if absent.is_empty() {
        Ok(())
    } else {
        Err(HarnessError::MissingField {
            field: absent.join(", "),
            expected: "present keys",
            body: value.clone(),
        })
    }
}

/// The `_id` of a reference that may or may not have been populated.
pub fn entity_id(value: &Value) -> Option<&str> {
    match value {
        Value::String(id) => Some(id),
        Value::Object(map) => map.get("_id").and_then(Value::as_str),
        _ => None,
    }
}

/// `entity_id` of the value at `path`, as an error when absent.
pub fn require_ref<'a>(value: &'a Value, path: &str) -> HarnessResult<&'a str> {
    lookup(value, path)
        .and_then(entity_id)
        .ok_or_else(|| missing(value, path, "an id or an object with `_id`"))
}

pub fn ensure(condition: bool, what: impl Into<String>, expected: Value, actual: Value) -> HarnessResult<()> {
    if condition {
        Ok(())
    } else {
        Err(HarnessError::Assertion {
            what: what.into(),
            expected,
            actual,
        })
    }
}

pub fn ensure_eq<T>(what: impl Into<String>, expected: T, actual: T) -> HarnessResult<()>
where
    T: PartialEq + Serialize,
{
    if expected == actual {
        Ok(())
    } else {
        Err(HarnessError::Assertion {
            what: what.into(),
            expected: json!(expected),
            actual: json!(actual),
        })
    }
}

/// Shorten long strings for result details.
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
