//! Trajectory-loop detection.
//!
//! Catches hallucination retry loops: the agent issuing a structurally
//! identical call over and over, typically after mis-parsing a failure.
//! History is in-memory only and intentionally resets on restart, matching
//! the lifetime of the conversational state that produces the loops.

use super::{Decision, PolicyRule, PRIORITY_TRAJECTORY, ReasonCode, RuleScope};
use crate::config::TrajectoryConfig;
use crate::fingerprint::fingerprint;
use crate::request::{CallSource, PolicyRequest};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Per-tool ring of recent call fingerprints.
type History = HashMap<String, VecDeque<(String, Instant)>>;

pub struct TrajectoryHashRule {
    config: TrajectoryConfig,
    window: Duration,
    scope: RuleScope,
    /// Count and append must be atomic together, otherwise two identical
    /// concurrent calls could both observe "under threshold".
    history: Mutex<History>,
}

impl TrajectoryHashRule {
    pub fn new(config: TrajectoryConfig) -> Self {
        Self {
            window: Duration::from_secs(config.window_secs),
            config,
            scope: RuleScope::All,
            history: Mutex::new(HashMap::new()),
        }
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, History> {
        self.history
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl PolicyRule for TrajectoryHashRule {
    fn id(&self) -> &str {
        "plimsoll.trajectory_hash"
    }

    fn description(&self) -> &str {
        "denies a structurally identical call repeated past the loop threshold"
    }

    fn priority(&self) -> u32 {
        PRIORITY_TRAJECTORY
    }

    fn scope(&self) -> &RuleScope {
        &self.scope
    }

    fn evaluate(&self, request: &PolicyRequest) -> anyhow::Result<Option<Decision>> {
        // Heartbeat and user-initiated calls repeat by design.
        if request.turn.source != CallSource::Agent {
            return Ok(None);
        }

        let fp = fingerprint(&request.tool.name, &request.args);
        let now = Instant::now();
        let cutoff = now.checked_sub(self.window);

        let mut history = self.locked();
        let ring = history.entry(request.tool.name.clone()).or_default();

        if let Some(cutoff) = cutoff {
            while ring.front().is_some_and(|(_, t)| *t <= cutoff) {
                ring.pop_front();
            }
        }
        while ring.len() >= self.config.max_entries_per_tool {
            ring.pop_front();
        }

        let repeats = ring.iter().filter(|(f, _)| *f == fp).count();
        if repeats >= self.config.repeat_threshold as usize {
            return Ok(Some(Decision::deny(
                self.id(),
                ReasonCode::PlimsollTrajectoryLoop,
                format!(
                    "call to '{}' repeated {} times within {}s; this looks like a retry loop — \
                     change the arguments or stop",
                    request.tool.name,
                    repeats + 1,
                    self.window.as_secs()
                ),
            )));
        }

        ring.push_back((fp, now));
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{RiskLevel, ToolCategory, ToolDescriptor, TurnContext};
    use serde_json::{Map, json};

    fn rule(threshold: u32) -> TrajectoryHashRule {
        TrajectoryHashRule::new(TrajectoryConfig {
            repeat_threshold: threshold,
            window_secs: 300,
            max_entries_per_tool: 16,
        })
    }

    fn transfer(to: &str) -> PolicyRequest {
        let mut args = Map::new();
        args.insert("to_address".into(), json!(to));
        args.insert("amount_cents".into(), json!(100));
        PolicyRequest::new(
            ToolDescriptor::new("transfer_credits", RiskLevel::Critical, ToolCategory::Finance),
            args,
        )
    }

    #[test]
    fn first_and_second_occurrences_always_pass() {
        let rule = rule(2);
        let req = transfer("0xabc");
        assert_eq!(rule.evaluate(&req).unwrap(), None);
        assert_eq!(rule.evaluate(&req).unwrap(), None);
    }

    #[test]
    fn threshold_plus_first_repeat_denies() {
        let rule = rule(3);
        let req = transfer("0xabc");
        for _ in 0..3 {
            assert_eq!(rule.evaluate(&req).unwrap(), None);
        }
        let decision = rule.evaluate(&req).unwrap().unwrap();
        assert_eq!(decision.reason, ReasonCode::PlimsollTrajectoryLoop);
        assert!(!decision.message.contains("0xabc"));
    }

    #[test]
    fn distinct_arguments_never_loop() {
        let rule = rule(3);
        for i in 0..5 {
            let req = transfer(&format!("0x{i:040x}"));
            assert_eq!(rule.evaluate(&req).unwrap(), None);
        }
    }

    #[test]
    fn key_order_counts_as_the_same_call() {
        let rule = rule(2);
        let mut a = Map::new();
        a.insert("x".into(), json!(1));
        a.insert("y".into(), json!(2));
        let mut b = Map::new();
        b.insert("y".into(), json!(2));
        b.insert("x".into(), json!(1));
        let tool = ToolDescriptor::new("exec", RiskLevel::High, ToolCategory::Shell);
        assert_eq!(
            rule.evaluate(&PolicyRequest::new(tool.clone(), a.clone()))
                .unwrap(),
            None
        );
        assert_eq!(
            rule.evaluate(&PolicyRequest::new(tool.clone(), b.clone()))
                .unwrap(),
            None
        );
        assert!(rule.evaluate(&PolicyRequest::new(tool, a)).unwrap().is_some());
    }

    #[test]
    fn heartbeat_calls_are_exempt() {
        let rule = rule(2);
        let req = transfer("0xabc").with_turn(TurnContext {
            source: CallSource::Heartbeat,
            ..TurnContext::default()
        });
        for _ in 0..10 {
            assert_eq!(rule.evaluate(&req).unwrap(), None);
        }
    }

    #[test]
    fn ring_capacity_is_bounded() {
        let rule = rule(3);
        for i in 0..100 {
            let _ = rule.evaluate(&transfer(&format!("0x{i:040x}")));
        }
        let history = rule.locked();
        assert!(history.get("transfer_credits").unwrap().len() <= 16);
    }

    #[test]
    fn same_args_on_different_tools_are_independent() {
        let rule = rule(2);
        let mut args = Map::new();
        args.insert("path".into(), json!("/tmp/x"));
        for tool_name in ["file_read", "file_write"] {
            let tool = ToolDescriptor::new(tool_name, RiskLevel::Medium, ToolCategory::FileSystem);
            assert_eq!(
                rule.evaluate(&PolicyRequest::new(tool.clone(), args.clone()))
                    .unwrap(),
                None
            );
            assert_eq!(
                rule.evaluate(&PolicyRequest::new(tool, args.clone())).unwrap(),
                None
            );
        }
    }
}
