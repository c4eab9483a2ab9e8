//! Per-field format validation rules.
//!
//! Each rule targets a tool-name set and one argument field. An absent field
//! is no-opinion — many arguments are optional and validation only fires
//! when a value is present and malformed.

use super::{Decision, PolicyRule, PRIORITY_VALIDATION, ReasonCode, RuleScope};
use crate::request::PolicyRequest;
use serde_json::Value;

// ── Formats ──────────────────────────────────────────────────────

/// A fixed argument format a validation rule checks against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    /// npm-style package name, optionally scoped (`@scope/name`).
    NpmPackageName,
    /// Alphanumeric plus hyphens.
    SkillName,
    /// 7–40 lowercase hex chars.
    GitCommitHash,
    /// Integer 1–65535.
    Port,
    /// 5 whitespace-separated cron fields.
    CronExpression,
    /// `0x` + 40 hex chars, case-insensitive.
    EvmAddress,
}

impl FieldFormat {
    pub fn expected(self) -> &'static str {
        match self {
            Self::NpmPackageName => "an npm-style package name",
            Self::SkillName => "alphanumeric characters and hyphens",
            Self::GitCommitHash => "7-40 lowercase hex characters",
            Self::Port => "an integer between 1 and 65535",
            Self::CronExpression => "a 5-field cron expression",
            Self::EvmAddress => "0x followed by 40 hex characters",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Port => is_valid_port(value),
            Self::NpmPackageName => value.as_str().is_some_and(is_valid_npm_package_name),
            Self::SkillName => value.as_str().is_some_and(is_valid_skill_name),
            Self::GitCommitHash => value.as_str().is_some_and(is_valid_commit_hash),
            Self::CronExpression => value.as_str().is_some_and(is_valid_cron_expression),
            Self::EvmAddress => value.as_str().is_some_and(is_valid_evm_address),
        }
    }
}

fn is_valid_npm_package_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 214 {
        return false;
    }
    let unscoped = if let Some(rest) = name.strip_prefix('@') {
        let Some((scope, pkg)) = rest.split_once('/') else {
            return false;
        };
        if !is_valid_npm_segment(scope) {
            return false;
        }
        pkg
    } else {
        name
    };
    is_valid_npm_segment(unscoped)
}

fn is_valid_npm_segment(segment: &str) -> bool {
    if segment.is_empty() || segment.starts_with('.') || segment.starts_with('_') {
        return false;
    }
    segment
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
}

fn is_valid_skill_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_valid_commit_hash(hash: &str) -> bool {
    (7..=40).contains(&hash.len())
        && hash
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

fn is_valid_port(value: &Value) -> bool {
    value
        .as_u64()
        .is_some_and(|port| (1..=65_535).contains(&port))
}

fn is_valid_cron_expression(expr: &str) -> bool {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    fields.len() == 5
        && fields.iter().all(|field| {
            !field.is_empty()
                && field
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, '*' | ',' | '-' | '/'))
        })
}

fn is_valid_evm_address(addr: &str) -> bool {
    let Some(hex_part) = addr.strip_prefix("0x") else {
        return false;
    };
    hex_part.len() == 40 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

// ── Rule ─────────────────────────────────────────────────────────

/// Validates one argument field of one or more tools against a fixed format.
pub struct FieldFormatRule {
    id: String,
    description: String,
    field: String,
    format: FieldFormat,
    scope: RuleScope,
}

impl FieldFormatRule {
    pub fn new(
        id: impl Into<String>,
        tools: &[&str],
        field: impl Into<String>,
        format: FieldFormat,
    ) -> Self {
        let field = field.into();
        Self {
            id: id.into(),
            description: format!("'{field}' must be {}", format.expected()),
            field,
            format,
            scope: RuleScope::Tools(tools.iter().map(ToString::to_string).collect()),
        }
    }
}

impl PolicyRule for FieldFormatRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn priority(&self) -> u32 {
        PRIORITY_VALIDATION
    }

    fn scope(&self) -> &RuleScope {
        &self.scope
    }

    fn evaluate(&self, request: &PolicyRequest) -> anyhow::Result<Option<Decision>> {
        let Some(value) = request.arg(&self.field) else {
            return Ok(None);
        };
        if self.format.accepts(value) {
            return Ok(None);
        }
        Ok(Some(Decision::deny(
            &self.id,
            ReasonCode::ValidationFailed,
            format!(
                "invalid value {} for '{}': expected {}",
                display_snippet(value),
                self.field,
                self.format.expected()
            ),
        )))
    }
}

/// Render the offending value for the deny message, bounded so a huge
/// argument cannot flood the transcript.
fn display_snippet(value: &Value) -> String {
    const MAX_CHARS: usize = 60;
    let rendered = value.to_string();
    if rendered.chars().count() <= MAX_CHARS {
        return rendered;
    }
    let truncated: String = rendered.chars().take(MAX_CHARS).collect();
    format!("{truncated}...")
}

/// The stock validation rule set, one rule per field format.
pub fn default_validation_rules() -> Vec<FieldFormatRule> {
    vec![
        FieldFormatRule::new(
            "validate.package_name",
            &["install_package"],
            "package",
            FieldFormat::NpmPackageName,
        ),
        FieldFormatRule::new(
            "validate.skill_name",
            &["install_skill", "invoke_skill"],
            "skill",
            FieldFormat::SkillName,
        ),
        FieldFormatRule::new(
            "validate.commit_hash",
            &["git_checkout"],
            "commit",
            FieldFormat::GitCommitHash,
        ),
        FieldFormatRule::new(
            "validate.port",
            &["start_server"],
            "port",
            FieldFormat::Port,
        ),
        FieldFormatRule::new(
            "validate.cron_expression",
            &["schedule_task"],
            "schedule",
            FieldFormat::CronExpression,
        ),
        FieldFormatRule::new(
            "validate.address_format",
            &["transfer_credits", "register_agent"],
            "to_address",
            FieldFormat::EvmAddress,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{RiskLevel, ToolCategory, ToolDescriptor};
    use serde_json::{Map, json};

    fn request(tool: &str, args: &[(&str, serde_json::Value)]) -> PolicyRequest {
        let args: Map<String, serde_json::Value> = args
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        PolicyRequest::new(
            ToolDescriptor::new(tool, RiskLevel::Medium, ToolCategory::Other),
            args,
        )
    }

    #[test]
    fn absent_field_is_no_opinion() {
        let rule = FieldFormatRule::new(
            "validate.address_format",
            &["transfer_credits"],
            "to_address",
            FieldFormat::EvmAddress,
        );
        let req = request("transfer_credits", &[("amount_cents", json!(100))]);
        assert_eq!(rule.evaluate(&req).unwrap(), None);
    }

    #[test]
    fn malformed_address_denies() {
        let rule = FieldFormatRule::new(
            "validate.address_format",
            &["transfer_credits"],
            "to_address",
            FieldFormat::EvmAddress,
        );
        let req = request("transfer_credits", &[("to_address", json!("0xNOTHEX"))]);
        let decision = rule.evaluate(&req).unwrap().unwrap();
        assert_eq!(decision.reason, ReasonCode::ValidationFailed);
        assert!(decision.message.contains("to_address"));
    }

    #[test]
    fn well_formed_address_is_no_opinion() {
        let rule = FieldFormatRule::new(
            "validate.address_format",
            &["transfer_credits"],
            "to_address",
            FieldFormat::EvmAddress,
        );
        let addr = format!("0x{}", "aB3f".repeat(10));
        let req = request("transfer_credits", &[("to_address", json!(addr))]);
        assert_eq!(rule.evaluate(&req).unwrap(), None);
    }

    #[test]
    fn npm_package_names() {
        assert!(is_valid_npm_package_name("lodash"));
        assert!(is_valid_npm_package_name("@scope/pkg-name"));
        assert!(is_valid_npm_package_name("left-pad.js"));
        assert!(!is_valid_npm_package_name(""));
        assert!(!is_valid_npm_package_name(".hidden"));
        assert!(!is_valid_npm_package_name("_private"));
        assert!(!is_valid_npm_package_name("UPPER"));
        assert!(!is_valid_npm_package_name("@scope"));
        assert!(!is_valid_npm_package_name("has space"));
    }

    #[test]
    fn skill_names() {
        assert!(is_valid_skill_name("price-watcher2"));
        assert!(!is_valid_skill_name("price_watcher"));
        assert!(!is_valid_skill_name(""));
    }

    #[test]
    fn commit_hashes() {
        assert!(is_valid_commit_hash("abc1234"));
        assert!(is_valid_commit_hash(&"a".repeat(40)));
        assert!(!is_valid_commit_hash("abc123"));
        assert!(!is_valid_commit_hash(&"a".repeat(41)));
        assert!(!is_valid_commit_hash("ABC1234"));
        assert!(!is_valid_commit_hash("xyz1234"));
    }

    #[test]
    fn ports() {
        assert!(is_valid_port(&json!(1)));
        assert!(is_valid_port(&json!(65_535)));
        assert!(!is_valid_port(&json!(0)));
        assert!(!is_valid_port(&json!(65_536)));
        assert!(!is_valid_port(&json!(-1)));
        assert!(!is_valid_port(&json!("8080")));
    }

    #[test]
    fn cron_expressions() {
        assert!(is_valid_cron_expression("*/5 * * * *"));
        assert!(is_valid_cron_expression("0 9-17 * * 1-5"));
        assert!(!is_valid_cron_expression("* * * *"));
        assert!(!is_valid_cron_expression("* * * * * *"));
        assert!(!is_valid_cron_expression("every five minutes now then"));
    }

    #[test]
    fn evm_addresses() {
        assert!(is_valid_evm_address(&format!("0x{}", "ab12CD34ef".repeat(4))));
        assert!(!is_valid_evm_address(&format!("0x{}", "a".repeat(39))));
        assert!(!is_valid_evm_address(&format!("0x{}", "a".repeat(41))));
        assert!(!is_valid_evm_address(&"a".repeat(42)));
        assert!(!is_valid_evm_address("0xNOTHEX"));
    }

    #[test]
    fn long_offending_values_are_truncated_in_the_message() {
        let rule = FieldFormatRule::new(
            "validate.package_name",
            &["install_package"],
            "package",
            FieldFormat::NpmPackageName,
        );
        let req = request("install_package", &[("package", json!("X".repeat(500)))]);
        let decision = rule.evaluate(&req).unwrap().unwrap();
        assert!(decision.message.len() < 200);
    }
}
