//! # Stopping the agent on host termination.
//!
//! [`shutdown_on_signal`] is for hosts that have no lifecycle of their own (the
//! demo, small wrappers): it parks until either the host process is asked to
//! terminate or the supervisor stops by itself, then runs
//! [`Supervisor::shutdown`] and hands back its outcome.
//!
//! ```text
//! select {
//!   SIGINT | SIGTERM | SIGQUIT | Ctrl-C  ─┐
//!   supervisor.stopped()                 ─┴─► supervisor.shutdown() ─► ShutdownOutcome
//! }
//! ```

use std::io;

use super::supervisor::{ShutdownOutcome, Supervisor};

/// Waits for a termination signal or for the supervisor to stop, then shuts it down.
///
/// Returns `Err` only if the signal handlers cannot be registered; the supervisor
/// is left untouched in that case.
pub async fn shutdown_on_signal(supervisor: &Supervisor) -> io::Result<ShutdownOutcome> {
    let agent = &*supervisor.config().name;
    tokio::select! {
        res = termination_signal() => {
            res?;
            tracing::info!(agent, "termination signal received; stopping agent");
        }
        _ = supervisor.stopped() => {
            tracing::info!(agent, "agent supervisor stopped on its own");
        }
    }
    Ok(supervisor.shutdown().await)
}

#[cfg(unix)]
async fn termination_signal() -> io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn termination_signal() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::SupervisorConfig;
    use crate::core::SupervisorState;
    use crate::policies::RestartPolicy;
    use crate::process::FixedPath;

    #[tokio::test]
    async fn returns_once_the_agent_gives_up() {
        let sup = Supervisor::new(
            SupervisorConfig::new(FixedPath::new("/nonexistent/hws-agent"))
                .with_restart(RestartPolicy::new(Duration::from_millis(5), 1)),
        );
        sup.start(None).unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(5), shutdown_on_signal(&sup))
            .await
            .expect("no signal needed once the supervisor stopped")
            .unwrap();
        assert_eq!(outcome, ShutdownOutcome::Completed);
        assert_eq!(sup.state(), SupervisorState::Stopped);
    }
}
