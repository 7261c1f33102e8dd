//! # Supervisor: lifecycle handle for one agent process.
//!
//! The [`Supervisor`] owns the event bus, the cancellation token handed to the control
//! loop and the completion marker the loop closes on `Stopped`. It never touches the
//! child itself: everything process-related lives in the loop task.
//!
//! ## High-level architecture
//! ```text
//! start(host):
//!   Launch (taken once) ──► SubscriberSet::listen(bus)          (if any subscribers)
//!                       ──► Machine::prepare(cfg)               (fatal? → Stopped + Err)
//!                       ──► tokio::spawn(Machine::run(first))   (returns immediately)
//!
//! Event flow:
//!   Machine ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit(&Event)
//!                                   └──► subscribe() receivers (tests, host)
//!
//! shutdown():
//!   Bus.publish(ShutdownRequested)
//!   cancel.cancel()                  → loop: Running → ShuttingDown → Stopped
//!   timeout(grace, stopped.cancelled()):
//!      ├─ Ok       → Bus.publish(StoppedWithinGrace) → Completed
//!      └─ Elapsed  → Bus.publish(GraceExceeded)      → GraceExceeded
//! ```
//!
//! ## Rules
//! - `start` succeeds at most once; later calls return [`SupervisorError::AlreadyStarted`].
//! - `shutdown` never fails and never escalates past the single termination request.
//! - `shutdown` before `start` returns [`ShutdownOutcome::Completed`]; the loop is
//!   cancelled in advance, so a later `start` stops without spawning.
//!
//! ## Example
//! ```no_run
//! use agentvisor::{FixedPath, ShutdownOutcome, Supervisor, SupervisorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), agentvisor::SupervisorError> {
//!     let cfg = SupervisorConfig::new(FixedPath::new("/opt/hws/bin/hws-agent"))
//!         .with_args(["--grpc=localhost:4317"]);
//!     let sup = Supervisor::new(cfg);
//!
//!     sup.start(None)?;
//!     // ... host runs ...
//!     assert_eq!(sup.shutdown().await, ShutdownOutcome::Completed);
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, watch};
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::builder::SupervisorBuilder;
use super::machine::Machine;
use super::state::SupervisorState;
use crate::config::SupervisorConfig;
use crate::error::SupervisorError;
use crate::events::{Bus, Event, EventKind};
use crate::extension::Host;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Result of [`Supervisor::shutdown`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The loop reached `Stopped` within the grace period.
    Completed,
    /// The grace period elapsed first; the loop keeps waiting for the agent.
    GraceExceeded,
}

impl ShutdownOutcome {
    /// True for [`ShutdownOutcome::Completed`].
    pub fn is_completed(&self) -> bool {
        matches!(self, ShutdownOutcome::Completed)
    }
}

/// Pieces consumed by the first `start`.
struct Launch {
    state: watch::Sender<SupervisorState>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

/// Lifecycle handle for one supervised agent.
pub struct Supervisor {
    cfg: Arc<SupervisorConfig>,
    bus: Bus,
    cancel: CancellationToken,
    stopped: CancellationToken,
    state: watch::Receiver<SupervisorState>,
    launch: Mutex<Option<Launch>>,
}

impl Supervisor {
    /// Creates a supervisor that only logs its lifecycle through `tracing`.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self::builder(cfg).build()
    }

    /// Returns a builder for a supervisor with extra subscribers.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(cfg: SupervisorConfig, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let (state_tx, state_rx) = watch::channel(SupervisorState::Starting);
        Self {
            cfg: Arc::new(cfg),
            bus,
            cancel: CancellationToken::new(),
            stopped: CancellationToken::new(),
            state: state_rx,
            launch: Mutex::new(Some(Launch {
                state: state_tx,
                subscribers,
            })),
        }
    }

    /// Launches the control loop and returns without waiting for the agent.
    ///
    /// The first invocation is prepared here so that pipe allocation failure is
    /// returned to the caller instead of being retried. Spawn failures are not
    /// errors at this point: they go through the retry policy in the loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, host: Option<Arc<dyn Host>>) -> Result<(), SupervisorError> {
        let launch = self
            .launch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(SupervisorError::AlreadyStarted)?;

        if !launch.subscribers.is_empty() {
            SubscriberSet::new(launch.subscribers).listen(&self.bus);
        }

        match Machine::prepare(&self.cfg) {
            Err(err) if err.is_fatal() => {
                self.bus.publish(
                    Event::new(EventKind::Fatal)
                        .with_agent(Arc::clone(&self.cfg.name))
                        .with_reason(err.to_string()),
                );
                launch.state.send_replace(SupervisorState::Stopped);
                self.stopped.cancel();
                Err(err)
            }
            first => {
                let machine = Machine::new(
                    Arc::clone(&self.cfg),
                    self.bus.clone(),
                    launch.state,
                    self.cancel.clone(),
                    self.stopped.clone(),
                    host,
                );
                tokio::spawn(machine.run(first));
                Ok(())
            }
        }
    }

    /// Requests a graceful stop and waits up to the grace period for it.
    pub async fn shutdown(&self) -> ShutdownOutcome {
        self.cancel.cancel();
        if !self.is_launched() {
            return ShutdownOutcome::Completed;
        }
        self.bus.publish(Event::new(EventKind::ShutdownRequested).with_agent(Arc::clone(&self.cfg.name)));

        let grace = self.cfg.grace;
        match time::timeout(grace, self.stopped.cancelled()).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::StoppedWithinGrace));
                ShutdownOutcome::Completed
            }
            Err(_elapsed) => {
                let err = SupervisorError::ShutdownTimeout { grace };
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded)
                        .with_delay(grace)
                        .with_reason(err.to_string()),
                );
                ShutdownOutcome::GraceExceeded
            }
        }
    }

    /// Current state of the control loop.
    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<SupervisorState> {
        self.state.clone()
    }

    /// Subscribes to lifecycle events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Completes once the loop has reached `Stopped`. Any number of waiters.
    pub async fn stopped(&self) {
        self.stopped.cancelled().await
    }

    /// True once the completion marker is closed.
    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }

    /// The immutable configuration this supervisor runs with.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    fn is_launched(&self) -> bool {
        self.launch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}
