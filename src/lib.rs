#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]

//! Plimsoll — pre-execution policy guard for autonomous financial agents.
//!
//! Every candidate tool call is wrapped in a [`PolicyRequest`] and passed to
//! [`PolicyEngine::evaluate_all`] before dispatch. Rules run in priority
//! order and the first denial wins; `None` means execute. The stock rule set
//! combines per-field format validation with three safety detectors:
//! trajectory-loop detection, capital velocity limiting, and an entropy
//! guard that blocks private-key and seed-phrase exfiltration.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod request;
pub mod rules;
pub mod spend;

pub use config::{EntropyConfig, PlimsollConfig, TrajectoryConfig, VelocityConfig};
pub use error::{ConfigError, PlimsollError, RuleError};
pub use request::{
    CallSource, ExecutionContext, PolicyRequest, RiskLevel, ToolCategory, ToolDescriptor,
    TurnContext,
};
pub use rules::{Decision, PolicyEngine, PolicyRule, ReasonCode, RuleScope};
pub use spend::{InMemorySpendTracker, LimitStatus, SpendTracker};
