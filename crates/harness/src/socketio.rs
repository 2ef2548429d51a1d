//! Engine.IO polling handshake parsing
//!
//! A polling `GET /socket.io/?EIO=4&transport=polling` answers with the open
//! packet: type `0` followed by a JSON object. Protocol v4 separates packets
//! with the record separator `\x1e`; protocol v3 prefixes each packet with its
//! length and a colon (`96:0{...}`).

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, HarnessResult};

const RECORD_SEPARATOR: char = '\u{1e}';

/// Engine.IO open packet payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

pub fn parse_open_packet(payload: &str) -> HarnessResult<Handshake> {
    let first = payload
        .split(RECORD_SEPARATOR)
        .next()
        .unwrap_or_default()
        .trim();
    let packet = strip_length_prefix(first);

    let json = packet.strip_prefix('0').ok_or_else(|| HarnessError::MissingField {
        field: "<open packet>".to_string(),
        expected: "an Engine.IO open packet (type 0)",
        body: serde_json::Value::String(payload.to_string()),
    })?;

    // v3 payloads carry further packets after the open packet's JSON
    let handshake: Handshake = serde_json::Deserializer::from_str(json)
        .into_iter::<Handshake>()
        .next()
        .ok_or_else(|| HarnessError::MissingField {
            field: "<open packet>".to_string(),
            expected: "a JSON handshake object",
            body: serde_json::Value::String(payload.to_string()),
        })??;
    if handshake.sid.is_empty() {
        return Err(HarnessError::MissingField {
            field: "sid".to_string(),
            expected: "a non-empty session id",
            body: serde_json::Value::String(payload.to_string()),
        });
    }
    Ok(handshake)
}

fn strip_length_prefix(packet: &str) -> &str {
    match packet.split_once(':') {
        Some((len, rest)) if !len.is_empty() && len.bytes().all(|b| b.is_ascii_digit()) => rest,
        _ => packet,
    }
}
