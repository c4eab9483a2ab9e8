use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ── Top-level config ──────────────────────────────────────────────

/// Tunable thresholds for every guard engine.
///
/// Acceptable values vary by deployment risk tolerance, so nothing here is
/// hard-coded into the rules; hosts load this from TOML alongside the rest
/// of their agent config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlimsollConfig {
    #[serde(default)]
    pub trajectory: TrajectoryConfig,

    #[serde(default)]
    pub velocity: VelocityConfig,

    #[serde(default)]
    pub entropy: EntropyConfig,
}

impl PlimsollConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).context("failed to parse plimsoll config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        self.trajectory.validate()?;
        self.velocity.validate()?;
        self.entropy.validate()?;
        Ok(())
    }
}

// ── Trajectory loop detection ────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryConfig {
    /// Identical fingerprints tolerated within the window before a deny.
    #[serde(default = "default_repeat_threshold")]
    pub repeat_threshold: u32,
    /// Detection window in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// History ring capacity per tool name.
    #[serde(default = "default_max_entries_per_tool")]
    pub max_entries_per_tool: usize,
}

impl TrajectoryConfig {
    fn validate(&self) -> Result<()> {
        if self.repeat_threshold < 2 {
            anyhow::bail!("trajectory.repeat_threshold must be >= 2");
        }
        if self.window_secs == 0 {
            anyhow::bail!("trajectory.window_secs must be >= 1");
        }
        if self.max_entries_per_tool == 0 {
            anyhow::bail!("trajectory.max_entries_per_tool must be >= 1");
        }
        Ok(())
    }
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            repeat_threshold: default_repeat_threshold(),
            window_secs: default_window_secs(),
            max_entries_per_tool: default_max_entries_per_tool(),
        }
    }
}

fn default_repeat_threshold() -> u32 {
    3
}

fn default_window_secs() -> u64 {
    300
}

fn default_max_entries_per_tool() -> usize {
    256
}

// ── Capital velocity ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityConfig {
    #[serde(default = "default_hourly_cap_cents")]
    pub hourly_cap_cents: u64,
    #[serde(default = "default_daily_cap_cents")]
    pub daily_cap_cents: u64,
}

impl VelocityConfig {
    fn validate(&self) -> Result<()> {
        if self.hourly_cap_cents == 0 {
            anyhow::bail!("velocity.hourly_cap_cents must be >= 1");
        }
        if self.daily_cap_cents == 0 {
            anyhow::bail!("velocity.daily_cap_cents must be >= 1");
        }
        if self.hourly_cap_cents > self.daily_cap_cents {
            anyhow::bail!("velocity.hourly_cap_cents must be <= velocity.daily_cap_cents");
        }
        Ok(())
    }
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            hourly_cap_cents: default_hourly_cap_cents(),
            daily_cap_cents: default_daily_cap_cents(),
        }
    }
}

fn default_hourly_cap_cents() -> u64 {
    10_000
}

fn default_daily_cap_cents() -> u64 {
    50_000
}

// ── Entropy guard ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntropyConfig {
    /// Strings shorter than this are never scanned.
    #[serde(default = "default_min_scan_len")]
    pub min_scan_len: usize,
    /// Recursion cap for nested argument structures.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Consecutive BIP-39 words that count as a seed phrase (12 catches
    /// both 12- and 24-word mnemonics).
    #[serde(default = "default_mnemonic_min_words")]
    pub mnemonic_min_words: usize,
}

impl EntropyConfig {
    fn validate(&self) -> Result<()> {
        if self.min_scan_len == 0 {
            anyhow::bail!("entropy.min_scan_len must be >= 1");
        }
        if self.max_depth == 0 {
            anyhow::bail!("entropy.max_depth must be >= 1");
        }
        if self.mnemonic_min_words < 6 {
            anyhow::bail!("entropy.mnemonic_min_words must be >= 6");
        }
        Ok(())
    }
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            min_scan_len: default_min_scan_len(),
            max_depth: default_max_depth(),
            mnemonic_min_words: default_mnemonic_min_words(),
        }
    }
}

fn default_min_scan_len() -> usize {
    32
}

fn default_max_depth() -> usize {
    16
}

fn default_mnemonic_min_words() -> usize {
    12
}
