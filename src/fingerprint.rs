//! Stable fingerprinting of tool calls.
//!
//! A fingerprint is the SHA-256 hex digest of the tool name plus a canonical
//! rendering of its argument map. Canonical means object keys are emitted in
//! sorted order and numerically-equal numbers render identically, so
//! `{a:1,b:2}` and `{b:2,a:1}` — or `100` and `100.0` — collide on purpose.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Fingerprint a tool call for trajectory-loop detection.
pub fn fingerprint(tool_name: &str, args: &Map<String, Value>) -> String {
    let mut canonical = String::with_capacity(64);
    write_map(&mut canonical, args);

    let mut hasher = Sha256::new();
    hasher.update(tool_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => {
            // serde_json escaping keeps embedded quotes/backslashes unambiguous.
            out.push_str(&Value::String(s.clone()).to_string());
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => write_map(out, map),
    }
}

fn write_map(out: &mut String, map: &Map<String, Value>) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort_unstable();

    out.push('{');
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&Value::String((*key).clone()).to_string());
        out.push(':');
        if let Some(value) = map.get(key.as_str()) {
            write_value(out, value);
        }
    }
    out.push('}');
}

/// Integer-valued floats render as integers so `100` and `100.0` agree.
#[allow(clippy::cast_possible_truncation)]
fn write_number(out: &mut String, n: &serde_json::Number) {
    if let Some(i) = n.as_i64() {
        out.push_str(&i.to_string());
        return;
    }
    if let Some(u) = n.as_u64() {
        out.push_str(&u.to_string());
        return;
    }
    if let Some(f) = n.as_f64() {
        if f.is_finite() && f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
            out.push_str(&(f as i64).to_string());
        } else {
            out.push_str(&f.to_string());
        }
        return;
    }
    out.push_str("null");
}
