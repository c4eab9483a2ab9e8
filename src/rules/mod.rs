mod entropy;
mod patterns;
mod trajectory;
mod validation;
mod velocity;

pub use entropy::EntropyGuardRule;
pub use trajectory::TrajectoryHashRule;
pub use validation::{FieldFormat, FieldFormatRule};
pub use velocity::CapitalVelocityRule;

use crate::config::PlimsollConfig;
use crate::error::RuleError;
use crate::request::{PolicyRequest, RiskLevel, ToolCategory, ToolDescriptor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ── Decisions ────────────────────────────────────────────────────

/// Stable machine-readable cause of a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    ValidationFailed,
    PlimsollTrajectoryLoop,
    PlimsollVelocityExceeded,
    PlimsollKeyExfil,
    PlimsollMnemonicExfil,
}

impl ReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::PlimsollTrajectoryLoop => "PLIMSOLL_TRAJECTORY_LOOP",
            Self::PlimsollVelocityExceeded => "PLIMSOLL_VELOCITY_EXCEEDED",
            Self::PlimsollKeyExfil => "PLIMSOLL_KEY_EXFIL",
            Self::PlimsollMnemonicExfil => "PLIMSOLL_MNEMONIC_EXFIL",
        }
    }
}

/// A denial. There is no explicit allow — the default policy is
/// allow-unless-denied, so `None` from every rule means proceed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Id of the rule that denied.
    pub rule: String,
    pub reason: ReasonCode,
    /// Safe to surface back into the agent's context; never echoes a secret.
    pub message: String,
}

impl Decision {
    pub fn deny(rule: impl Into<String>, reason: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            reason,
            message: message.into(),
        }
    }
}

// ── Rule contract ────────────────────────────────────────────────

/// Which requests a rule wants to see.
#[derive(Debug, Clone)]
pub enum RuleScope {
    All,
    /// Exact tool name set.
    Tools(Vec<String>),
    Category(ToolCategory),
    RiskAtLeast(RiskLevel),
}

impl RuleScope {
    pub fn matches(&self, tool: &ToolDescriptor) -> bool {
        match self {
            Self::All => true,
            Self::Tools(names) => names.iter().any(|n| n == &tool.name),
            Self::Category(category) => tool.category == *category,
            Self::RiskAtLeast(level) => tool.risk >= *level,
        }
    }
}

/// A named, prioritized unit of policy logic.
///
/// `evaluate` returns `Ok(Some(..))` to deny, `Ok(None)` for no-opinion.
/// An `Err` is an internal fault: the engine logs it and skips the rule
/// (fail-open for that rule only), so rules should report faults rather
/// than panic or guess.
pub trait PolicyRule: Send + Sync {
    fn id(&self) -> &str;

    fn description(&self) -> &str;

    /// Lower runs first; ties keep registration order.
    fn priority(&self) -> u32;

    fn scope(&self) -> &RuleScope;

    fn evaluate(&self, request: &PolicyRequest) -> anyhow::Result<Option<Decision>>;
}

// ── Engine ───────────────────────────────────────────────────────

/// Default priorities: format validation runs well before the heavier
/// Plimsoll detectors so malformed input never reaches an entropy scan.
pub const PRIORITY_VALIDATION: u32 = 100;
pub const PRIORITY_TRAJECTORY: u32 = 400;
pub const PRIORITY_VELOCITY: u32 = 420;
pub const PRIORITY_ENTROPY: u32 = 450;

/// The policy engine — every candidate tool call flows through
/// [`PolicyEngine::evaluate_all`] before dispatch.
pub struct PolicyEngine {
    rules: Vec<Arc<dyn PolicyRule>>,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The production rule set: field-format validation, trajectory-loop
    /// detection, capital velocity, entropy guard.
    pub fn with_default_rules(config: &PlimsollConfig) -> Self {
        let mut engine = Self::new();
        let mut rules: Vec<Arc<dyn PolicyRule>> = Vec::new();
        for rule in validation::default_validation_rules() {
            rules.push(Arc::new(rule));
        }
        rules.push(Arc::new(TrajectoryHashRule::new(config.trajectory.clone())));
        rules.push(Arc::new(CapitalVelocityRule::new()));
        rules.push(Arc::new(EntropyGuardRule::new(config.entropy.clone())));

        for rule in rules {
            // Default ids are distinct by construction.
            if let Err(err) = engine.register(rule) {
                tracing::error!(error = %err, "skipping default rule");
            }
        }
        engine
    }

    /// Register a rule. Ids must be unique within an engine.
    pub fn register(&mut self, rule: Arc<dyn PolicyRule>) -> Result<(), RuleError> {
        if self.rules.iter().any(|r| r.id() == rule.id()) {
            return Err(RuleError::DuplicateId(rule.id().to_string()));
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    /// Evaluate every applicable rule in priority order and return the first
    /// denial, or `None` when every rule has no opinion.
    ///
    /// Never propagates an error: a faulting rule is logged and skipped,
    /// which is distinct in the logs from a clean no-opinion.
    pub fn evaluate_all(&self, request: &PolicyRequest) -> Option<Decision> {
        let mut applicable: Vec<&Arc<dyn PolicyRule>> = self
            .rules
            .iter()
            .filter(|rule| rule.scope().matches(&request.tool))
            .collect();
        // Vec::sort_by_key is stable, so equal priorities keep registration order.
        applicable.sort_by_key(|rule| rule.priority());

        for rule in applicable {
            match rule.evaluate(request) {
                Ok(Some(decision)) => {
                    tracing::warn!(
                        rule = %decision.rule,
                        reason = decision.reason.as_str(),
                        tool = %request.tool.name,
                        session = %request.context.session_id,
                        "policy deny"
                    );
                    return Some(decision);
                }
                Ok(None) => {
                    tracing::trace!(rule = rule.id(), tool = %request.tool.name, "no opinion");
                }
                Err(err) => {
                    tracing::error!(
                        rule = rule.id(),
                        tool = %request.tool.name,
                        error = %err,
                        "rule fault, treated as no-opinion"
                    );
                }
            }
        }
        None
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}
