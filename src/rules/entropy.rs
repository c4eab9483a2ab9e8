//! Entropy guard: secret-exfiltration scanning.
//!
//! Recursively walks every string reachable through a call's arguments and
//! denies when one carries a raw private key or a seed phrase. The deny
//! message names the offending field path only — the matched value is never
//! echoed, logged, or retained.

use super::patterns::{contains_hex_private_key, contains_mnemonic_phrase};
use super::{Decision, PolicyRule, PRIORITY_ENTROPY, ReasonCode, RuleScope};
use crate::config::EntropyConfig;
use crate::request::PolicyRequest;
use serde_json::Value;

pub struct EntropyGuardRule {
    config: EntropyConfig,
    scope: RuleScope,
}

impl EntropyGuardRule {
    pub fn new(config: EntropyConfig) -> Self {
        Self {
            config,
            scope: RuleScope::All,
        }
    }

    fn scan_string(&self, s: &str) -> Option<ReasonCode> {
        if s.len() < self.config.min_scan_len {
            return None;
        }
        if contains_hex_private_key(s) {
            return Some(ReasonCode::PlimsollKeyExfil);
        }
        if contains_mnemonic_phrase(s, self.config.mnemonic_min_words) {
            return Some(ReasonCode::PlimsollMnemonicExfil);
        }
        None
    }

    /// Depth-first walk; returns the first hit as `(reason, field path)`.
    fn scan_value(&self, value: &Value, path: &str, depth: usize) -> Option<(ReasonCode, String)> {
        if depth > self.config.max_depth {
            return None;
        }
        match value {
            Value::String(s) => self.scan_string(s).map(|reason| (reason, path.to_string())),
            Value::Array(items) => items.iter().enumerate().find_map(|(i, item)| {
                self.scan_value(item, &format!("{path}[{i}]"), depth + 1)
            }),
            Value::Object(map) => map.iter().find_map(|(key, item)| {
                self.scan_value(item, &format!("{path}.{key}"), depth + 1)
            }),
            Value::Null | Value::Bool(_) | Value::Number(_) => None,
        }
    }
}

impl PolicyRule for EntropyGuardRule {
    fn id(&self) -> &str {
        "plimsoll.entropy_guard"
    }

    fn description(&self) -> &str {
        "denies arguments carrying a raw private key or seed phrase"
    }

    fn priority(&self) -> u32 {
        PRIORITY_ENTROPY
    }

    fn scope(&self) -> &RuleScope {
        &self.scope
    }

    fn evaluate(&self, request: &PolicyRequest) -> anyhow::Result<Option<Decision>> {
        for (key, value) in &request.args {
            if let Some((reason, path)) = self.scan_value(value, key, 1) {
                let what = match reason {
                    ReasonCode::PlimsollKeyExfil => "a hex private key",
                    _ => "a seed phrase",
                };
                return Ok(Some(Decision::deny(
                    self.id(),
                    reason,
                    format!("argument '{path}' contains what looks like {what}; refusing to pass it on"),
                )));
            }
        }
        Ok(None)
    }
}
