//! Error types used by the agent supervisor.
//!
//! [`SupervisorError`] covers failures raised while launching, watching or stopping
//! the agent. It provides helper methods (`as_label`, `is_fatal`) for logging and
//! for deciding whether the control loop may keep going.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the supervisor.
///
/// Most variants are transient: they are absorbed by the control loop, consume one
/// retry and are only surfaced through events and logs. [`SupervisorError::PipeAllocation`]
/// is the exception and aborts the enclosing operation.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// The child process could not be spawned.
    #[error("failed to start {}: {source}", .program.display())]
    StartFailure {
        /// Resolved program path.
        program: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The executable path could not be resolved.
    #[error("cannot resolve agent executable: {reason}")]
    Resolve {
        /// Human-readable cause.
        reason: String,
    },

    /// The child terminated while no shutdown was requested.
    #[error("agent exited unexpectedly: {}", describe_exit(.status))]
    UnexpectedExit {
        /// Exit status, if the OS reported one.
        status: Option<ExitStatus>,
    },

    /// The retry budget is spent; the supervisor stops for good.
    #[error("agent died after {attempts} start attempt(s); retry budget exhausted")]
    RetryBudgetExhausted {
        /// Total number of start attempts performed.
        attempts: u32,
    },

    /// Shutdown waited for the whole grace period without the agent exiting.
    #[error("agent did not stop within {grace:?}")]
    ShutdownTimeout {
        /// The grace period that elapsed.
        grace: Duration,
    },

    /// The communication pipes could not be allocated (resource exhaustion).
    #[error("cannot allocate agent pipes: {source}")]
    PipeAllocation {
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// `start` was called on a supervisor that is already running.
    #[error("supervisor already started")]
    AlreadyStarted,
}

impl SupervisorError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use agentvisor::SupervisorError;
    ///
    /// let err = SupervisorError::RetryBudgetExhausted { attempts: 3 };
    /// assert_eq!(err.as_label(), "retry_budget_exhausted");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorError::StartFailure { .. } => "start_failure",
            SupervisorError::Resolve { .. } => "resolve_failure",
            SupervisorError::UnexpectedExit { .. } => "unexpected_exit",
            SupervisorError::RetryBudgetExhausted { .. } => "retry_budget_exhausted",
            SupervisorError::ShutdownTimeout { .. } => "shutdown_timeout",
            SupervisorError::PipeAllocation { .. } => "pipe_allocation_failure",
            SupervisorError::AlreadyStarted => "already_started",
        }
    }

    /// Indicates whether the error must abort the enclosing operation.
    ///
    /// Only [`SupervisorError::PipeAllocation`] is fatal; start failures and crashes
    /// go through the retry policy.
    ///
    /// # Example
    /// ```
    /// use agentvisor::SupervisorError;
    ///
    /// let fatal = SupervisorError::PipeAllocation { source: std::io::Error::other("emfile") };
    /// assert!(fatal.is_fatal());
    ///
    /// let crash = SupervisorError::UnexpectedExit { status: None };
    /// assert!(!crash.is_fatal());
    /// ```
    pub fn is_fatal(&self) -> bool {
        matches!(self, SupervisorError::PipeAllocation { .. })
    }
}

fn describe_exit(status: &Option<ExitStatus>) -> String {
    match status {
        Some(s) => s.to_string(),
        None => "status unavailable".to_string(),
    }
}
