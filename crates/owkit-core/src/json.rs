//! JSON helpers for host payloads and state values

use serde_json::Value;

/// Decode a host value that may carry JSON inside a string.
///
/// Strings are parsed as JSON; when that fails the raw string is kept.
/// Every other value is already decoded and is returned as-is.
pub fn parse_lenient(raw: &Value) -> Value {
    match raw {
        Value::String(text) => match serde_json::from_str(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::trace!("keeping raw string value ({})", e);
                raw.clone()
            }
        },
        other => other.clone(),
    }
}
