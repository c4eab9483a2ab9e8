//! Spend tracking collaborator interface.
//!
//! The policy core only reads spend state; recording happens after a tool
//! actually executes, in the dispatch loop. A denied call therefore never
//! mutates spend totals. External invariant the tracker must uphold:
//! `check_limit` reflects every spend recorded before the call — the race
//! between a passing check and the post-execution `record_spend` is an
//! accepted, bounded risk window.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Snapshot of spend totals against configured ceilings, in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitStatus {
    pub allowed: bool,
    pub hourly_spent: u64,
    pub daily_spent: u64,
    pub hourly_limit: u64,
    pub daily_limit: u64,
}

/// Session-scoped spend ledger consumed by the capital velocity rule.
pub trait SpendTracker: Send + Sync {
    /// Record an executed spend. Called by the dispatch loop, never by rules.
    fn record_spend(&self, amount_cents: u64);

    /// Total recorded within the trailing hour.
    fn hourly_spend_cents(&self) -> u64;

    /// Total recorded today (UTC day).
    fn daily_spend_cents(&self) -> u64;

    /// Total recorded over the tracker's lifetime.
    fn total_spend_cents(&self) -> u64;

    /// Current totals and ceilings in one consistent snapshot.
    fn check_limit(&self) -> LimitStatus;
}

// ── In-memory implementation ─────────────────────────────────────

const HOUR: Duration = Duration::from_secs(3600);

#[derive(Debug)]
struct SpendState {
    /// `(when, amount)` entries within the trailing hour, oldest first.
    hourly: VecDeque<(Instant, u64)>,
    day_epoch: u64,
    daily_cents: u64,
    total_cents: u64,
}

/// Sliding-window spend tracker: an hourly `Instant` window plus a UTC
/// day-epoch counter that rolls over at midnight.
#[derive(Debug)]
pub struct InMemorySpendTracker {
    state: Mutex<SpendState>,
    hourly_limit: u64,
    daily_limit: u64,
}

impl InMemorySpendTracker {
    pub fn from_config(config: &crate::config::VelocityConfig) -> Self {
        Self::new(config.hourly_cap_cents, config.daily_cap_cents)
    }

    pub fn new(hourly_limit_cents: u64, daily_limit_cents: u64) -> Self {
        Self {
            state: Mutex::new(SpendState {
                hourly: VecDeque::new(),
                day_epoch: current_day_epoch(),
                daily_cents: 0,
                total_cents: 0,
            }),
            hourly_limit: hourly_limit_cents,
            daily_limit: daily_limit_cents,
        }
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, SpendState> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(cutoff) = Instant::now().checked_sub(HOUR) {
            while state.hourly.front().is_some_and(|(t, _)| *t <= cutoff) {
                state.hourly.pop_front();
            }
        }
        let today = current_day_epoch();
        if state.day_epoch != today {
            state.day_epoch = today;
            state.daily_cents = 0;
        }
        state
    }
}

impl SpendTracker for InMemorySpendTracker {
    fn record_spend(&self, amount_cents: u64) {
        if amount_cents == 0 {
            return;
        }
        let mut state = self.locked();
        state.hourly.push_back((Instant::now(), amount_cents));
        state.daily_cents = state.daily_cents.saturating_add(amount_cents);
        state.total_cents = state.total_cents.saturating_add(amount_cents);
    }

    fn hourly_spend_cents(&self) -> u64 {
        self.locked().hourly.iter().map(|(_, a)| a).sum()
    }

    fn daily_spend_cents(&self) -> u64 {
        self.locked().daily_cents
    }

    fn total_spend_cents(&self) -> u64 {
        self.locked().total_cents
    }

    fn check_limit(&self) -> LimitStatus {
        let state = self.locked();
        let hourly_spent: u64 = state.hourly.iter().map(|(_, a)| a).sum();
        let daily_spent = state.daily_cents;
        LimitStatus {
            allowed: hourly_spent <= self.hourly_limit && daily_spent <= self.daily_limit,
            hourly_spent,
            daily_spent,
            hourly_limit: self.hourly_limit,
            daily_limit: self.daily_limit,
        }
    }
}

fn current_day_epoch() -> u64 {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs();
    secs / 86_400
}

#[cfg(test)]
mod tests {
    use super::{InMemorySpendTracker, SpendTracker};

    #[test]
    fn totals_accumulate_across_records() {
        let tracker = InMemorySpendTracker::new(10_000, 50_000);
        tracker.record_spend(250);
        tracker.record_spend(750);
        assert_eq!(tracker.hourly_spend_cents(), 1_000);
        assert_eq!(tracker.daily_spend_cents(), 1_000);
        assert_eq!(tracker.total_spend_cents(), 1_000);
    }

    #[test]
    fn zero_amounts_are_not_recorded() {
        let tracker = InMemorySpendTracker::new(10_000, 50_000);
        tracker.record_spend(0);
        assert_eq!(tracker.total_spend_cents(), 0);
    }

    #[test]
    fn check_limit_reports_spends_and_ceilings() {
        let tracker = InMemorySpendTracker::new(1_000, 5_000);
        tracker.record_spend(400);
        let status = tracker.check_limit();
        assert!(status.allowed);
        assert_eq!(status.hourly_spent, 400);
        assert_eq!(status.daily_spent, 400);
        assert_eq!(status.hourly_limit, 1_000);
        assert_eq!(status.daily_limit, 5_000);
    }

    #[test]
    fn check_limit_flags_exceeded_hourly_ceiling() {
        let tracker = InMemorySpendTracker::new(1_000, 5_000);
        tracker.record_spend(1_200);
        assert!(!tracker.check_limit().allowed);
    }

    #[test]
    fn from_config_takes_the_velocity_caps() {
        let tracker = InMemorySpendTracker::from_config(&crate::config::VelocityConfig {
            hourly_cap_cents: 123,
            daily_cap_cents: 456,
        });
        let status = tracker.check_limit();
        assert_eq!(status.hourly_limit, 123);
        assert_eq!(status.daily_limit, 456);
    }
}
