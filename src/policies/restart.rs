//! # Restart policy for the agent.
//!
//! [`RestartPolicy`] pairs a [`RetryBudget`] with the fixed pause applied before each
//! restart. The delay does not grow between attempts: every restart waits the same
//! amount of real elapsed time.
//!
//! ```text
//! crash ──► Errored ──► budget.try_consume()
//!                         ├─ false → Stopped ("died")
//!                         └─ true  → Restarting ──► sleep(delay) ──► Starting
//! ```

use std::time::Duration;

use crate::policies::retry::RetryBudget;

/// Pause applied before every restart unless configured otherwise.
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(10);

/// Policy controlling whether and when the agent is restarted after a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Pause before each restart attempt.
    pub delay: Duration,
    /// Restarts permitted after the first failure.
    pub retries: RetryBudget,
}

impl RestartPolicy {
    /// Creates a policy with an explicit delay and signed retry setting.
    pub fn new(delay: Duration, retries: i64) -> Self {
        Self {
            delay,
            retries: RetryBudget::from_retries(retries),
        }
    }

    /// Total number of start attempts this policy allows (`None` = unlimited).
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use agentvisor::RestartPolicy;
    ///
    /// assert_eq!(RestartPolicy::new(Duration::ZERO, 2).max_attempts(), Some(3));
    /// assert_eq!(RestartPolicy::new(Duration::ZERO, -1).max_attempts(), None);
    /// ```
    pub fn max_attempts(&self) -> Option<u64> {
        self.retries.remaining().map(|n| u64::from(n) + 1)
    }
}

impl Default for RestartPolicy {
    /// Returns `delay = 10s`, `retries = Unlimited`.
    fn default() -> Self {
        Self {
            delay: DEFAULT_RESTART_DELAY,
            retries: RetryBudget::default(),
        }
    }
}
