//! # Supervisor states.
//!
//! [`SupervisorState`] is the observable tag of the control loop. The loop owns the
//! authoritative phase (with its payload: process handle, error cause); this enum is
//! the copy published through a `watch` channel.
//!
//! ```text
//!            ┌──────────── start failure ───────────┐
//!            ▼                                       │
//! Starting ──► Running ── unexpected exit ──► Errored ── budget left ──► Restarting ──► Starting
//!               │                               │
//!               └─ cancel ─► ShuttingDown       └─ exhausted / cancel ─► Stopped
//!                                 └──────────────────────────────────────► Stopped
//! ```

use std::fmt;

/// Current phase of the control loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SupervisorState {
    /// Building the command and spawning the agent.
    Starting,
    /// The agent is running; waiting for its exit or a shutdown request.
    Running,
    /// Termination requested; waiting for the agent to exit.
    ShuttingDown,
    /// Sleeping for the restart delay.
    Restarting,
    /// Terminal state.
    Stopped,
    /// Handling a start failure or an unexpected exit.
    Errored,
}

impl SupervisorState {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SupervisorState::Starting => "starting",
            SupervisorState::Running => "running",
            SupervisorState::ShuttingDown => "shutting_down",
            SupervisorState::Restarting => "restarting",
            SupervisorState::Stopped => "stopped",
            SupervisorState::Errored => "errored",
        }
    }

    /// True for [`SupervisorState::Stopped`].
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SupervisorState::Stopped)
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
