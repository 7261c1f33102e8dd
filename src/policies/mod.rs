//! Restart policies for the supervised agent.
//!
//! This module groups the knobs that control **if** the agent is restarted after a
//! failure and **how long** to wait before the next attempt.
//!
//! ## Contents
//! - [`RetryBudget`] how many restarts remain (bounded or unlimited)
//! - [`RestartPolicy`] retry budget plus the fixed delay applied before each restart
//!
//! ## Quick wiring
//! ```text
//! SupervisorConfig { restart: RestartPolicy, .. }
//!      └─► core::machine::Machine uses:
//!           - restart.retries.try_consume() to decide restart/stop
//!           - restart.delay to sleep before the next Starting phase
//! ```
//!
//! ## Defaults
//! - `RetryBudget::Unlimited` (the agent is restarted for as long as it keeps failing).
//! - `RestartPolicy::default()` → delay=10s, retries=Unlimited.

mod restart;
mod retry;

pub use restart::{DEFAULT_RESTART_DELAY, RestartPolicy};
pub use retry::{DEFAULT_RETRIES, RetryBudget};
