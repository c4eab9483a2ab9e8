use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `plimsoll`.
///
/// Library callers can match on these to decide recovery strategy; internal
/// code continues to use `anyhow::Result` for ad-hoc context chains. Note
/// that a policy deny is never an error — it is a `Decision` value.
#[derive(Debug, Error)]
pub enum PlimsollError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Rules ────────────────────────────────────────────────────────────
    #[error("rule: {0}")]
    Rule(#[from] RuleError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Invalid(String),
}

// ─── Rule errors ─────────────────────────────────────────────────────────────

/// Internal rule faults. These never surface from `evaluate_all` — the
/// engine logs them and treats the faulting rule as no-opinion — but they
/// are typed so registration and tests can distinguish fault causes.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule '{rule}' failed: {message}")]
    Internal { rule: String, message: String },

    #[error("duplicate rule id: {0}")]
    DuplicateId(String),
}
