//! VEAP wire format: reserved sub-resources and response decoding.
//!
//! Responses are decoded into tagged results here, so that pollers and the
//! registry match on `Result<ProcessValue, ClientError>` instead of probing
//! JSON fields.

use crate::error::ClientError;
use crate::types::{Address, Link, LogMessage, ProcessValue, VeapObject};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Process value sub-resource
pub const PV_SUFFIX: &str = "~pv";
/// History service
pub const HIST_SUFFIX: &str = "~hist";
/// Batch exchange service
pub const EXCHANGE_SUFFIX: &str = "~exgdata";
/// Query service
pub const QUERY_SUFFIX: &str = "~query";

/// Link targets with these suffixes are services, not navigable nodes.
pub const SERVICE_SUFFIXES: [&str; 4] = [PV_SUFFIX, HIST_SUFFIX, EXCHANGE_SUFFIX, QUERY_SUFFIX];

/// Address of the batch exchange service
pub const EXCHANGE_PATH: &str = "/~exgdata";
/// Vendor information of the server
pub const VENDOR_PATH: &str = "/~vendor";
/// Diagnostic indicators of the server
pub const DIAGNOSTICS_PATH: &str = "/~vendor/diagnostics/~pv";
/// Maintenance trigger: the server re-reads names, rooms, system variables and programs
pub const REFRESH_PATH: &str = "/~vendor/refresh/~pv";

/// Reserved key holding the links of a node
pub const LINKS_KEY: &str = "~links";

const INVALID_PV: &str = "Invalid JSON object for a process value";
const INVALID_EXCHANGE: &str = "Invalid response from the exchange data service";
const INVALID_EXCHANGE_ITEM: &str = "Invalid partial response from the exchange data service";

/// Address of the process value of `address`.
pub fn pv_path(address: &str) -> Address {
    let trimmed = address.trim_end_matches('/');
    format!("{}/{}", trimmed, PV_SUFFIX)
}

/// Whether a link target names a service sub-resource.
pub fn is_service_href(href: &str) -> bool {
    SERVICE_SUFFIXES.iter().any(|suffix| href.ends_with(suffix))
}

/// Decodes a process value.
///
/// The `v` key must be present; a JSON `null` value is a legal value.
pub fn decode_pv(body: &Value) -> Result<ProcessValue, ClientError> {
    let obj = body
        .as_object()
        .ok_or_else(|| ClientError::malformed(INVALID_PV))?;
    let value = obj
        .get("v")
        .cloned()
        .ok_or_else(|| ClientError::malformed(INVALID_PV))?;

    Ok(ProcessValue {
        value,
        timestamp: obj.get("ts").and_then(decode_timestamp),
        quality: obj.get("s").and_then(Value::as_i64),
    })
}

/// Accepts RFC 3339 strings and milliseconds since the epoch.
fn decode_timestamp(ts: &Value) -> Option<DateTime<Utc>> {
    let decoded = match ts {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::Null => return None,
        _ => None,
    };
    if decoded.is_none() {
        debug!(ts = %ts, "Ignoring unparseable timestamp");
    }
    decoded
}

/// Decodes the representation of a node fetched from `address`.
pub fn decode_object(address: &str, body: &Value) -> Result<VeapObject, ClientError> {
    let obj = body
        .as_object()
        .ok_or_else(|| ClientError::malformed("Invalid JSON object for a VEAP object"))?;

    let mut properties = BTreeMap::new();
    for (key, value) in obj {
        if key != "title" && key != "description" && key != LINKS_KEY {
            properties.insert(key.clone(), value.clone());
        }
    }

    Ok(VeapObject {
        address: address.to_string(),
        title: obj.get("title").and_then(Value::as_str).map(str::to_string),
        description: obj
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        properties,
        links: obj.get(LINKS_KEY).map(decode_links).unwrap_or_default(),
    })
}

fn decode_links(raw: &Value) -> Vec<Link> {
    let Some(entries) = raw.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let href = entry.get("href")?.as_str()?;
            Some(Link {
                href: href.to_string(),
                rel: entry.get("rel").and_then(Value::as_str).map(str::to_string),
                title: entry
                    .get("title")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        })
        .collect()
}

/// Request body of a batch read.
pub fn exchange_request(addresses: &[Address]) -> Value {
    json!({ "readPaths": addresses })
}

/// Decodes a batch read response for `expected` requested addresses.
///
/// The outer error covers the whole batch; inner results are per item and
/// positionally aligned with the request.
pub fn decode_exchange(
    body: &Value,
    expected: usize,
) -> Result<Vec<Result<ProcessValue, ClientError>>, ClientError> {
    let results = body
        .get("readResults")
        .and_then(Value::as_array)
        .filter(|results| results.len() == expected)
        .ok_or_else(|| ClientError::malformed(INVALID_EXCHANGE))?;

    Ok(results.iter().map(decode_exchange_item).collect())
}

fn decode_exchange_item(item: &Value) -> Result<ProcessValue, ClientError> {
    match item.get("error").filter(|e| !e.is_null()) {
        Some(error) => {
            let code = error
                .get("code")
                .and_then(Value::as_u64)
                .and_then(|c| u16::try_from(c).ok())
                .unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string);
            Err(ClientError::from_code(code, message))
        }
        None => match item.get("pv").filter(|pv| !pv.is_null()) {
            Some(pv) => decode_pv(pv),
            None => Err(ClientError::malformed(INVALID_EXCHANGE_ITEM)),
        },
    }
}

/// Encodes a batch read result item; the inverse of the per-item decoding.
pub fn exchange_item(result: &Result<ProcessValue, ClientError>) -> Value {
    match result {
        Ok(pv) => json!({ "pv": encode_pv(pv) }),
        Err(err) => {
            let mut error = Map::new();
            error.insert("code".to_string(), json!(err.code().unwrap_or(500)));
            let message = match err {
                ClientError::Transport { message } | ClientError::Protocol { message, .. } => {
                    message.clone()
                }
                other => Some(other.to_string()),
            };
            if let Some(message) = message {
                error.insert("message".to_string(), Value::String(message));
            }
            json!({ "error": error })
        }
    }
}

/// Encodes a process value in wire form.
pub fn encode_pv(pv: &ProcessValue) -> Value {
    let mut obj = Map::new();
    obj.insert("v".to_string(), pv.value.clone());
    if let Some(ts) = pv.timestamp {
        obj.insert("ts".to_string(), Value::String(ts.to_rfc3339()));
    }
    if let Some(s) = pv.quality {
        obj.insert("s".to_string(), json!(s));
    }
    Value::Object(obj)
}

/// Decodes the log entries of the diagnostics process value.
pub fn decode_diagnostics(pv: &ProcessValue) -> Result<Vec<LogMessage>, ClientError> {
    let entries = pv
        .value
        .get("Log")
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::malformed("Invalid JSON object for diagnostics"))?;

    Ok(entries
        .iter()
        .filter_map(|entry| {
            let fields = entry.as_array()?;
            let field = |idx: usize| {
                fields
                    .get(idx)
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .unwrap_or_default()
            };
            Some(LogMessage {
                timestamp: field(0),
                level: field(1),
                module: field(2),
                message: field(3),
            })
        })
        .collect())
}
