//! # Lifecycle events emitted by the supervisor.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Process events**: one child run (starting, started, start failure, exit)
//! - **Policy events**: restart scheduling and retry exhaustion
//! - **Shutdown events**: shutdown request, termination signal, grace outcome
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the agent
//! name, attempt number, pid, restart delay and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use agentvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RestartScheduled)
//!     .with_agent("hws-agent")
//!     .with_attempt(2)
//!     .with_delay(Duration::from_secs(10));
//!
//! assert_eq!(ev.kind, EventKind::RestartScheduled);
//! assert_eq!(ev.agent.as_deref(), Some("hws-agent"));
//! assert_eq!(ev.delay_ms, Some(10_000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, Instant, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of supervisor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Process events ===
    /// A start attempt begins.
    ///
    /// Sets:
    /// - `agent`: agent name
    /// - `attempt`: attempt number (1-based)
    ProcessStarting,

    /// The child process was spawned.
    ///
    /// Sets:
    /// - `agent`: agent name
    /// - `attempt`: attempt number
    /// - `pid`: OS process id (if reported)
    ProcessStarted,

    /// The child process could not be spawned.
    ///
    /// Sets:
    /// - `agent`: agent name
    /// - `attempt`: attempt number
    /// - `reason`: spawn error
    StartFailed,

    /// The child terminated while no shutdown was requested.
    ///
    /// Sets:
    /// - `agent`: agent name
    /// - `attempt`: attempt number
    /// - `pid`: OS process id (if reported)
    /// - `reason`: exit status
    ProcessExited,

    // === Policy events ===
    /// The next start attempt is scheduled after the restart delay.
    ///
    /// Sets:
    /// - `agent`: agent name
    /// - `attempt`: attempt that failed
    /// - `delay_ms`: restart delay (ms)
    /// - `reason`: failure message
    RestartScheduled,

    /// The retry budget is spent; the agent is considered dead.
    ///
    /// Sets:
    /// - `agent`: agent name
    /// - `attempt`: total attempts performed
    /// - `reason`: last failure message
    RetriesExhausted,

    /// Unrecoverable system condition; the supervisor stops.
    ///
    /// Sets:
    /// - `agent`: agent name
    /// - `reason`: error message
    Fatal,

    // === Shutdown events ===
    /// Shutdown requested by the host.
    ShutdownRequested,

    /// Termination signal sent to the child.
    ///
    /// Sets:
    /// - `agent`: agent name
    /// - `pid`: OS process id (if reported)
    TerminateSent,

    /// The child exited after a shutdown request.
    ///
    /// Sets:
    /// - `agent`: agent name
    /// - `reason`: exit status
    ProcessStopped,

    /// The control loop reached its terminal state.
    Stopped,

    /// Shutdown completed within the grace period.
    StoppedWithinGrace,

    /// Grace period elapsed before the control loop stopped.
    ///
    /// Sets:
    /// - `delay_ms`: grace period (ms)
    GraceExceeded,
}

/// Supervisor event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp
/// - `instant`: monotonic timestamp, for measuring intervals between events
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Monotonic timestamp taken together with `at`.
    pub instant: Instant,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the supervised agent.
    pub agent: Option<Arc<str>>,
    /// Start attempt (starting from 1).
    pub attempt: Option<u32>,
    /// OS process id of the child.
    pub pid: Option<u32>,
    /// Delay in milliseconds (restart delay or grace period).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, exit statuses).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            instant: Instant::now(),
            kind,
            agent: None,
            attempt: None,
            pid: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches the agent name.
    #[inline]
    pub fn with_agent(mut self, agent: impl Into<Arc<str>>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Attaches an attempt number.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a process id, if any.
    #[inline]
    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns the delay as a [`Duration`], if set.
    #[inline]
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(|ms| Duration::from_millis(u64::from(ms)))
    }
}
