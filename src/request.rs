use crate::spend::SpendTracker;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

// ── Tool descriptor ──────────────────────────────────────────────

/// Declared risk level of a tool, as registered by the host agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    /// Can move funds or touch key material.
    Critical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Finance,
    Shell,
    FileSystem,
    Network,
    Memory,
    #[default]
    Other,
}

/// Identity of the tool a call targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub risk: RiskLevel,
    pub category: ToolCategory,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, risk: RiskLevel, category: ToolCategory) -> Self {
        Self {
            name: name.into(),
            risk,
            category,
        }
    }
}

// ── Turn context ─────────────────────────────────────────────────

/// Where the current turn's input came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSource {
    #[default]
    Agent,
    Heartbeat,
    User,
}

/// Per-turn state the dispatch loop carries alongside each candidate call.
#[derive(Clone, Default)]
pub struct TurnContext {
    pub source: CallSource,
    /// Tool calls already issued this turn, before this one.
    pub calls_this_turn: u32,
    /// Session spend tracker; `None` means the velocity rule stands down.
    pub spend_tracker: Option<Arc<dyn SpendTracker>>,
}

impl std::fmt::Debug for TurnContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnContext")
            .field("source", &self.source)
            .field("calls_this_turn", &self.calls_this_turn)
            .field("spend_tracker", &self.spend_tracker.is_some())
            .finish()
    }
}

// ── Execution context ────────────────────────────────────────────

/// Opaque execution identity (sandbox/session), carried for logging only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub session_id: String,
}

// ── Policy request ───────────────────────────────────────────────

/// Immutable view of one proposed tool call.
///
/// Built by the dispatch loop once per candidate call and discarded after
/// the decision is produced; rules never mutate it.
#[derive(Debug, Clone)]
pub struct PolicyRequest {
    pub tool: ToolDescriptor,
    pub args: Map<String, Value>,
    pub context: ExecutionContext,
    pub turn: TurnContext,
}

impl PolicyRequest {
    pub fn new(tool: ToolDescriptor, args: Map<String, Value>) -> Self {
        Self {
            tool,
            args,
            context: ExecutionContext::default(),
            turn: TurnContext::default(),
        }
    }

    pub fn with_turn(mut self, turn: TurnContext) -> Self {
        self.turn = turn;
        self
    }

    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    /// Argument value by name, if present.
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// String argument by name; `None` when absent or not a string.
    pub fn str_arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).and_then(Value::as_str)
    }
}
