//! # Retry budget.
//!
//! [`RetryBudget`] counts the restarts still permitted after a failure. It is derived
//! from a signed setting:
//!
//! ```text
//! retries < 0  → RetryBudget::Unlimited      (restart forever)
//! retries = 0  → RetryBudget::Limited(0)     (one attempt, never restarted)
//! retries = N  → RetryBudget::Limited(N)     (N restarts, N + 1 attempts)
//! ```
//!
//! The budget only ever decreases, and only the control loop consumes it.

/// Signed sentinel meaning "restart indefinitely".
pub const DEFAULT_RETRIES: i64 = -1;

/// Number of restarts still permitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryBudget {
    /// Restart as long as the agent keeps failing.
    Unlimited,
    /// At most this many further restarts.
    Limited(u32),
}

impl RetryBudget {
    /// Derives a budget from the signed `retries` setting.
    ///
    /// Values above `u32::MAX` saturate.
    ///
    /// # Example
    /// ```
    /// use agentvisor::RetryBudget;
    ///
    /// assert_eq!(RetryBudget::from_retries(-1), RetryBudget::Unlimited);
    /// assert_eq!(RetryBudget::from_retries(0), RetryBudget::Limited(0));
    /// assert_eq!(RetryBudget::from_retries(3), RetryBudget::Limited(3));
    /// ```
    pub fn from_retries(retries: i64) -> Self {
        if retries < 0 {
            RetryBudget::Unlimited
        } else {
            RetryBudget::Limited(u32::try_from(retries).unwrap_or(u32::MAX))
        }
    }

    /// Returns `true` when no restart is left.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryBudget::Limited(0))
    }

    /// Remaining restarts (`None` = unlimited).
    #[inline]
    pub fn remaining(&self) -> Option<u32> {
        match self {
            RetryBudget::Unlimited => None,
            RetryBudget::Limited(n) => Some(*n),
        }
    }

    /// Consumes one restart.
    ///
    /// Returns `false` (and leaves the budget untouched) when it is already exhausted.
    pub fn try_consume(&mut self) -> bool {
        match self {
            RetryBudget::Unlimited => true,
            RetryBudget::Limited(0) => false,
            RetryBudget::Limited(n) => {
                *n -= 1;
                true
            }
        }
    }
}

impl Default for RetryBudget {
    /// Returns [`RetryBudget::Unlimited`].
    fn default() -> Self {
        RetryBudget::from_retries(DEFAULT_RETRIES)
    }
}

impl From<i64> for RetryBudget {
    fn from(retries: i64) -> Self {
        RetryBudget::from_retries(retries)
    }
}
