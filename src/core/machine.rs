//! # Machine: the agent control loop.
//!
//! Sequences one agent through its lifecycle with an explicit phase enum and a
//! transition function ([`Machine::step`]):
//!
//! | Phase        | Entry action                                   | Next                                   |
//! |--------------|------------------------------------------------|----------------------------------------|
//! | Starting     | resolve, build, wire pipes, spawn              | Running / Errored / Stopped (fatal)    |
//! | Running      | wait for exit **or** cancellation              | Errored / ShuttingDown / Stopped (race) |
//! | Errored      | publish cause, consume one retry               | Restarting / Stopped                   |
//! | Restarting   | sleep `restart.delay` (cancellable)            | Starting / Stopped                     |
//! | ShuttingDown | one terminate request, wait for exit report    | Stopped                                |
//! | Stopped      | publish `Stopped`, close the completion marker | (terminal)                             |
//!
//! ## Rules
//! - At most one [`ProcessHandle`] is alive; it is consumed before leaving Running or
//!   ShuttingDown, which closes its pipes before any new Starting phase.
//! - The retry budget is consumed only in Errored, and never once cancellation is observed.
//! - The completion marker is cancelled exactly once, after the state reads `Stopped`.
//! - Cancellation is observed in Starting, Running, Errored and Restarting; ShuttingDown
//!   is only left through the exit report.

use std::sync::Arc;

use tokio::process::ChildStdin;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::SupervisorConfig;
use crate::core::state::SupervisorState;
use crate::error::SupervisorError;
use crate::events::{Bus, Event, EventKind};
use crate::extension::Host;
use crate::policies::RetryBudget;
use crate::process::relay::spawn_relay;
use crate::process::{ExitOutcome, ExitWatcher, PreparedCommand, wire_pipes};

/// Outcome of command preparation.
pub(crate) type Prepared = Result<PreparedCommand, SupervisorError>;

/// The live child of one run.
pub(crate) struct ProcessHandle {
    stdin: Option<ChildStdin>,
    watcher: ExitWatcher,
    relays: Vec<JoinHandle<()>>,
}

impl ProcessHandle {
    /// Closes the stdin write end and detaches the relays (they end on EOF).
    fn close(self) {
        drop(self.stdin);
        drop(self.relays);
    }
}

/// Phase of the control loop, with the data owned in that phase.
pub(crate) enum Phase {
    /// `Some` carries a command prepared ahead of the loop (first run only).
    Starting(Option<Prepared>),
    Running(ProcessHandle),
    Errored(SupervisorError),
    Restarting,
    ShuttingDown(ProcessHandle),
    Stopped,
}

impl Phase {
    pub(crate) fn state(&self) -> SupervisorState {
        match self {
            Phase::Starting(_) => SupervisorState::Starting,
            Phase::Running(_) => SupervisorState::Running,
            Phase::Errored(_) => SupervisorState::Errored,
            Phase::Restarting => SupervisorState::Restarting,
            Phase::ShuttingDown(_) => SupervisorState::ShuttingDown,
            Phase::Stopped => SupervisorState::Stopped,
        }
    }
}

/// Owns every piece of mutable supervision state for one supervisor instance.
pub(crate) struct Machine {
    cfg: Arc<SupervisorConfig>,
    retries: RetryBudget,
    attempt: u32,
    pid: Option<u32>,
    bus: Bus,
    state: watch::Sender<SupervisorState>,
    cancel: CancellationToken,
    stopped: CancellationToken,
    host: Option<Arc<dyn Host>>,
}

impl Machine {
    pub(crate) fn new(
        cfg: Arc<SupervisorConfig>,
        bus: Bus,
        state: watch::Sender<SupervisorState>,
        cancel: CancellationToken,
        stopped: CancellationToken,
        host: Option<Arc<dyn Host>>,
    ) -> Self {
        Self {
            retries: cfg.restart.retries,
            cfg,
            attempt: 0,
            pid: None,
            bus,
            state,
            cancel,
            stopped,
            host,
        }
    }

    /// Resolves the executable, builds the platform command and wires its pipes.
    pub(crate) fn prepare(cfg: &SupervisorConfig) -> Prepared {
        let program = cfg.resolver.resolve()?;
        let command = cfg.command.build(&program, &cfg.args);
        wire_pipes(&program, command)
    }

    /// Drives the loop from Starting until Stopped.
    pub(crate) async fn run(mut self, first: Prepared) {
        let mut phase = Phase::Starting(Some(first));
        loop {
            self.state.send_replace(phase.state());
            if matches!(phase, Phase::Stopped) {
                break;
            }
            phase = self.step(phase).await;
        }
        self.publish(Event::new(EventKind::Stopped));
        self.stopped.cancel();
    }

    /// Runs the entry action of `phase` and returns the next phase.
    pub(crate) async fn step(&mut self, phase: Phase) -> Phase {
        match phase {
            Phase::Starting(prepared) => self.on_starting(prepared),
            Phase::Running(handle) => self.on_running(handle).await,
            Phase::Errored(cause) => self.on_errored(cause),
            Phase::Restarting => self.on_restarting().await,
            Phase::ShuttingDown(handle) => self.on_shutting_down(handle).await,
            Phase::Stopped => Phase::Stopped,
        }
    }

    fn on_starting(&mut self, prepared: Option<Prepared>) -> Phase {
        if self.cancel.is_cancelled() {
            return Phase::Stopped;
        }
        self.attempt += 1;
        self.publish(Event::new(EventKind::ProcessStarting).with_attempt(self.attempt));

        let prepared = match prepared.unwrap_or_else(|| Self::prepare(&self.cfg)) {
            Ok(prepared) => prepared,
            Err(err) if err.is_fatal() => {
                self.fatal(err);
                return Phase::Stopped;
            }
            Err(err) => return Phase::Errored(err),
        };

        let program = prepared.program().to_path_buf();
        let (mut child, outputs) = match prepared.spawn() {
            Ok(spawned) => spawned,
            Err(source) => return Phase::Errored(SupervisorError::StartFailure { program, source }),
        };

        let stdin = child.stdin.take();
        let relays = outputs
            .into_iter()
            .map(|output| spawn_relay(output, Arc::clone(&self.cfg.name)))
            .collect();
        let watcher = ExitWatcher::spawn(child);
        self.pid = watcher.pid();
        self.publish(
            Event::new(EventKind::ProcessStarted)
                .with_attempt(self.attempt)
                .with_pid(watcher.pid()),
        );
        Phase::Running(ProcessHandle {
            stdin,
            watcher,
            relays,
        })
    }

    async fn on_running(&mut self, mut handle: ProcessHandle) -> Phase {
        let exited = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            outcome = handle.watcher.exited() => Some(outcome),
        };
        let Some(outcome) = exited else {
            return Phase::ShuttingDown(handle);
        };
        handle.close();

        // The exit raced a shutdown request: nothing left to terminate, never restart.
        if self.cancel.is_cancelled() {
            self.publish(Event::new(EventKind::ProcessStopped).with_reason(describe(&outcome)));
            return Phase::Stopped;
        }
        Phase::Errored(SupervisorError::UnexpectedExit {
            status: outcome.ok(),
        })
    }

    fn on_errored(&mut self, cause: SupervisorError) -> Phase {
        let cause_event = match cause {
            SupervisorError::UnexpectedExit { .. } => {
                Event::new(EventKind::ProcessExited).with_pid(self.pid.take())
            }
            _ => Event::new(EventKind::StartFailed),
        };
        self.publish(
            cause_event
                .with_attempt(self.attempt)
                .with_reason(cause.to_string()),
        );

        if self.cancel.is_cancelled() {
            return Phase::Stopped;
        }
        if !self.retries.try_consume() {
            let died = SupervisorError::RetryBudgetExhausted {
                attempts: self.attempt,
            };
            self.publish(
                Event::new(EventKind::RetriesExhausted)
                    .with_attempt(self.attempt)
                    .with_reason(format!("{died}: {cause}")),
            );
            return Phase::Stopped;
        }

        self.publish(
            Event::new(EventKind::RestartScheduled)
                .with_attempt(self.attempt)
                .with_delay(self.cfg.restart.delay)
                .with_reason(cause.to_string()),
        );
        Phase::Restarting
    }

    async fn on_restarting(&mut self) -> Phase {
        let sleep = time::sleep(self.cfg.restart.delay);
        tokio::pin!(sleep);
        tokio::select! {
            _ = &mut sleep => Phase::Starting(None),
            _ = self.cancel.cancelled() => Phase::Stopped,
        }
    }

    async fn on_shutting_down(&mut self, mut handle: ProcessHandle) -> Phase {
        if handle.watcher.request_terminate() {
            self.publish(Event::new(EventKind::TerminateSent).with_pid(handle.watcher.pid()));
        }
        let outcome = handle.watcher.exited().await;
        self.publish(Event::new(EventKind::ProcessStopped).with_reason(describe(&outcome)));
        handle.close();
        Phase::Stopped
    }

    fn fatal(&self, err: SupervisorError) {
        self.publish(Event::new(EventKind::Fatal).with_reason(err.to_string()));
        if let Some(host) = &self.host {
            host.report_fatal_error(&err);
        }
    }

    fn publish(&self, ev: Event) {
        self.bus.publish(ev.with_agent(Arc::clone(&self.cfg.name)));
    }

    #[cfg(test)]
    pub(crate) fn retries(&self) -> RetryBudget {
        self.retries
    }
}

fn describe(outcome: &ExitOutcome) -> String {
    match outcome {
        Ok(status) => status.to_string(),
        Err(err) => err.to_string(),
    }
}
