//! Login throttling
//!
//! Per-user state machine with two states. Five consecutive failures move
//! an account to `Throttled`; it falls back to `Normal` once the window has
//! passed since the last failure, or immediately on a successful login.

use serde::{Deserialize, Serialize};

/// Throttle parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottlePolicy {
    /// Consecutive failures that activate the cooldown
    pub max_failed_attempts: u32,
    /// Cooldown after the most recent failure (seconds)
    pub window_secs: i64,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            window_secs: 300,
        }
    }
}

/// Throttle state of one account at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleState {
    Normal,
    Throttled { retry_after_secs: i64 },
}

impl ThrottleState {
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }
}

impl ThrottlePolicy {
    /// Evaluate the recorded failure counters at `now`
    pub fn evaluate(&self, failed_attempts: u32, last_failed_at: i64, now: i64) -> ThrottleState {
        if failed_attempts < self.max_failed_attempts {
            return ThrottleState::Normal;
        }
        // A failure stamped in the future counts as just now.
        let elapsed = now.saturating_sub(last_failed_at).max(0);
        if elapsed < self.window_secs {
            ThrottleState::Throttled {
                retry_after_secs: self.window_secs.saturating_sub(elapsed),
            }
        } else {
            ThrottleState::Normal
        }
    }

    /// Remaining tries before the cooldown starts
    pub fn remaining_attempts(&self, failed_attempts: u32) -> u32 {
        self.max_failed_attempts.saturating_sub(failed_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_limit_is_normal() {
        let p = ThrottlePolicy::default();
        assert_eq!(p.evaluate(4, 1_000, 1_001), ThrottleState::Normal);
        assert_eq!(p.remaining_attempts(4), 1);
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        let p = ThrottlePolicy::default();
        assert_eq!(p.evaluate(5, i64::MIN, 1_000), ThrottleState::Normal);
        assert_eq!(
            p.evaluate(5, i64::MAX, 1_000),
            ThrottleState::Throttled {
                retry_after_secs: 300
            }
        );
        assert_eq!(p.evaluate(u32::MAX, 0, i64::MAX), ThrottleState::Normal);
    }

    #[test]
    fn test_window() {
        let p = ThrottlePolicy::default();
        assert_eq!(
            p.evaluate(5, 1_000, 1_100),
            ThrottleState::Throttled {
                retry_after_secs: 200
            }
        );
        assert!(p.evaluate(5, 1_000, 1_299).is_throttled());
        assert_eq!(p.evaluate(5, 1_000, 1_300), ThrottleState::Normal);
    }

    #[test]
    fn test_counter_keeps_growing_while_throttled() {
        let p = ThrottlePolicy::default();
        assert!(p.evaluate(9, 1_000, 1_010).is_throttled());
        assert_eq!(p.remaining_attempts(9), 0);
    }
}
