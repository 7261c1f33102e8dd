//! # Exit watcher.
//!
//! Owns the spawned [`Child`] on a dedicated task, waits for the OS to report its
//! termination and sends the result **exactly once** through a oneshot channel.
//! The control loop is the sole receiver and treats receipt as proof of exit.
//!
//! The loop never touches the child directly. To stop it, the loop calls
//! [`ExitWatcher::request_terminate`]; the watcher then sends the platform's
//! termination signal a single time and keeps waiting:
//!
//! ```text
//! select {
//!   child.wait()          ─► send(status)
//!   terminate requested   ─► terminate(child) ─► child.wait() ─► send(status)
//! }
//! ```

use std::io;
use std::process::ExitStatus;

use tokio::process::Child;
use tokio::sync::oneshot;

/// Result reported by the watcher.
pub type ExitOutcome = io::Result<ExitStatus>;

/// Loop-side handle of one watcher task.
#[derive(Debug)]
pub struct ExitWatcher {
    pid: Option<u32>,
    exit: Option<oneshot::Receiver<ExitOutcome>>,
    terminate: Option<oneshot::Sender<()>>,
}

impl ExitWatcher {
    /// Moves `child` onto a new watcher task.
    pub fn spawn(child: Child) -> Self {
        let pid = child.id();
        let (exit_tx, exit_rx) = oneshot::channel();
        let (term_tx, term_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let mut child = child;
            let outcome = tokio::select! {
                status = child.wait() => status,
                requested = term_rx => {
                    if requested.is_ok() {
                        if let Err(err) = terminate(&mut child) {
                            tracing::warn!(pid = child.id(), %err, "failed to signal agent");
                        }
                    }
                    child.wait().await
                }
            };
            let _ = exit_tx.send(outcome);
        });

        Self {
            pid,
            exit: Some(exit_rx),
            terminate: Some(term_tx),
        }
    }

    /// OS process id, if the child was still running at spawn time.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Asks the watcher to send the termination signal.
    ///
    /// Returns `true` only for the first request that reached a live watcher.
    pub fn request_terminate(&mut self) -> bool {
        match self.terminate.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Waits for the exit report.
    ///
    /// Cancel-safe: may be polled from `select!` and awaited again afterwards. Once
    /// the report has been taken, later calls return an error immediately.
    pub async fn exited(&mut self) -> ExitOutcome {
        let Some(rx) = self.exit.as_mut() else {
            return Err(io::Error::other("exit already reported"));
        };
        let res = rx.await;
        self.exit = None;
        match res {
            Ok(outcome) => outcome,
            Err(_) => Err(io::Error::other("exit watcher dropped")),
        }
    }
}

/// Sends SIGTERM to the child.
#[cfg(unix)]
fn terminate(child: &mut Child) -> io::Result<()> {
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pid = libc::pid_t::try_from(pid).map_err(io::Error::other)?;
    // SAFETY: kill(2) has no memory-safety preconditions.
    if unsafe { libc::kill(pid, libc::SIGTERM) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Terminates the child (no cooperative signal exists for console-less processes).
#[cfg(not(unix))]
fn terminate(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::process::Command;

    #[tokio::test]
    async fn reports_exit_once() {
        let child = Command::new("sh").args(["-c", "exit 3"]).spawn().unwrap();
        let mut watcher = ExitWatcher::spawn(child);
        assert!(watcher.pid().is_some());

        let status = watcher.exited().await.unwrap();
        assert_eq!(status.code(), Some(3));
        assert!(watcher.exited().await.is_err());
    }

    #[tokio::test]
    async fn terminate_request_sends_sigterm() {
        use std::os::unix::process::ExitStatusExt;

        let child = Command::new("sleep").arg("30").spawn().unwrap();
        let mut watcher = ExitWatcher::spawn(child);

        assert!(watcher.request_terminate());
        assert!(!watcher.request_terminate());

        let status = tokio::time::timeout(Duration::from_secs(5), watcher.exited())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.signal(), Some(libc::SIGTERM));
    }
}
