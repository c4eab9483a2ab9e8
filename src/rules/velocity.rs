//! Capital velocity limiting.
//!
//! Caps the *rate* of value movement regardless of any per-call limit the
//! host enforces elsewhere. The rule only reads spend state; recording
//! happens after a tool actually executes, so a denied call never moves the
//! totals.

use super::{Decision, PolicyRule, PRIORITY_VELOCITY, ReasonCode, RuleScope};
use crate::request::PolicyRequest;
use serde_json::Value;

pub struct CapitalVelocityRule {
    scope: RuleScope,
}

impl CapitalVelocityRule {
    pub fn new() -> Self {
        Self {
            scope: RuleScope::All,
        }
    }
}

impl Default for CapitalVelocityRule {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyRule for CapitalVelocityRule {
    fn id(&self) -> &str {
        "plimsoll.capital_velocity"
    }

    fn description(&self) -> &str {
        "denies a spend that would push hourly or daily totals past their caps"
    }

    fn priority(&self) -> u32 {
        PRIORITY_VELOCITY
    }

    fn scope(&self) -> &RuleScope {
        &self.scope
    }

    fn evaluate(&self, request: &PolicyRequest) -> anyhow::Result<Option<Decision>> {
        let Some(amount) = request.arg("amount_cents").and_then(amount_cents) else {
            return Ok(None);
        };
        if amount == 0 {
            return Ok(None);
        }

        let Some(tracker) = request.turn.spend_tracker.as_ref() else {
            // Deliberate fail-open: a misconfigured collaborator must not
            // turn the guard into a total-denial single point of failure.
            tracing::warn!(
                tool = %request.tool.name,
                "no spend tracker on request; capital velocity unguarded"
            );
            return Ok(None);
        };

        let status = tracker.check_limit();
        let hourly_after = status.hourly_spent.saturating_add(amount);
        let daily_after = status.daily_spent.saturating_add(amount);

        if hourly_after > status.hourly_limit {
            return Ok(Some(Decision::deny(
                self.id(),
                ReasonCode::PlimsollVelocityExceeded,
                format!(
                    "spending {amount} cents would put the hourly total at {hourly_after} of a \
                     {} cent cap (current: {})",
                    status.hourly_limit, status.hourly_spent
                ),
            )));
        }
        if daily_after > status.daily_limit {
            return Ok(Some(Decision::deny(
                self.id(),
                ReasonCode::PlimsollVelocityExceeded,
                format!(
                    "spending {amount} cents would put the daily total at {daily_after} of a \
                     {} cent cap (current: {})",
                    status.daily_limit, status.daily_spent
                ),
            )));
        }
        Ok(None)
    }
}

/// Accept integer-valued numbers only; negative or fractional amounts are
/// not a spend this rule can reason about.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn amount_cents(value: &Value) -> Option<u64> {
    if let Some(u) = value.as_u64() {
        return Some(u);
    }
    if let Some(f) = value.as_f64()
        && f.is_finite()
        && f >= 0.0
        && f.fract() == 0.0
        && f <= u64::MAX as f64
    {
        return Some(f as u64);
    }
    None
}
