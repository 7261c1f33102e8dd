//! # LogWriter: events to `tracing`
//!
//! A subscriber that turns supervisor [`Event`]s into structured `tracing` records,
//! so the host's logging pipeline sees the agent lifecycle.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! DEBUG agent="hws-agent" attempt=1 starting agent
//!  INFO agent="hws-agent" attempt=1 pid=4242 agent started
//! ERROR agent="hws-agent" attempt=1 reason="exit status: 1" agent exited unexpectedly
//!  INFO agent="hws-agent" attempt=1 delay_ms=10000 restarting agent
//! ERROR agent="hws-agent" attempt=3 reason="exit status: 1" agent died
//!  WARN grace_ms=5000 agent did not stop within grace period
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let agent = e.agent.as_deref().unwrap_or("agent");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::ProcessStarting => {
                tracing::debug!(agent, attempt = e.attempt, "starting agent");
            }
            EventKind::ProcessStarted => {
                tracing::info!(agent, attempt = e.attempt, pid = e.pid, "agent started");
            }
            EventKind::StartFailed => {
                tracing::error!(agent, attempt = e.attempt, reason, "failed to start agent");
            }
            EventKind::ProcessExited => {
                tracing::error!(agent, attempt = e.attempt, pid = e.pid, reason, "agent exited unexpectedly");
            }
            EventKind::RestartScheduled => {
                tracing::info!(agent, attempt = e.attempt, delay_ms = e.delay_ms, "restarting agent");
            }
            EventKind::RetriesExhausted => {
                tracing::error!(agent, attempt = e.attempt, reason, "agent died");
            }
            EventKind::Fatal => {
                tracing::error!(agent, reason, "agent supervisor stopped on fatal error");
            }
            EventKind::ShutdownRequested => {
                tracing::info!("agent shutdown requested");
            }
            EventKind::TerminateSent => {
                tracing::debug!(agent, pid = e.pid, "termination signal sent");
            }
            EventKind::ProcessStopped => {
                tracing::info!(agent, reason, "agent stopped");
            }
            EventKind::Stopped => {
                tracing::debug!(agent, "agent supervisor stopped");
            }
            EventKind::StoppedWithinGrace => {
                tracing::debug!("agent stopped within grace period");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(grace_ms = e.delay_ms, "agent did not stop within grace period");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
