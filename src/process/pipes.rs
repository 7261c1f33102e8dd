//! # Pipe wiring for one child run.
//!
//! Each run gets two unidirectional channels:
//! - **input**: `Stdio::piped()` on stdin; the supervisor holds the write end;
//! - **output**: on unix, one anonymous OS pipe whose write end is shared by stdout
//!   *and* stderr, so the relay reads a single interleaved stream. The read end is
//!   registered with the tokio reactor, so a relay blocked on it never outlives the
//!   runtime. Elsewhere stdout and stderr are two tokio pipes relayed side by side.
//!
//! Allocating the output pipe can only fail on descriptor exhaustion; that is
//! reported as [`SupervisorError::PipeAllocation`] and treated as fatal.
//!
//! The parent's copies of the write ends live inside the [`Command`]; it is dropped
//! right after spawning so that the relay observes EOF once the child exits.

use std::io;
#[cfg(unix)]
use std::io::PipeReader;
#[cfg(unix)]
use std::os::fd::OwnedFd;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncRead;
use tokio::process::{Child, Command};

use crate::error::SupervisorError;

/// One readable output stream of the child.
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// A command with its pipes attached, ready to spawn exactly once.
#[derive(Debug)]
pub struct PreparedCommand {
    program: PathBuf,
    command: Command,
    #[cfg(unix)]
    output: PipeReader,
}

impl PreparedCommand {
    /// Program that will be spawned.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Spawns the child and returns it with the read side of its output.
    ///
    /// The command (and with it the parent's write ends) is dropped in every case.
    /// Must be called from within a tokio runtime.
    #[cfg(unix)]
    pub fn spawn(self) -> io::Result<(Child, Vec<OutputStream>)> {
        let PreparedCommand {
            mut command,
            output,
            ..
        } = self;
        let output = tokio::net::unix::pipe::Receiver::from_owned_fd(OwnedFd::from(output))?;
        let child = command.spawn();
        drop(command);
        Ok((child?, vec![Box::new(output) as OutputStream]))
    }

    /// Spawns the child and returns it with its stdout and stderr streams.
    #[cfg(not(unix))]
    pub fn spawn(self) -> io::Result<(Child, Vec<OutputStream>)> {
        let PreparedCommand { mut command, .. } = self;
        let mut child = command.spawn()?;
        let mut outputs: Vec<OutputStream> = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            outputs.push(Box::new(stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            outputs.push(Box::new(stderr));
        }
        Ok((child, outputs))
    }
}

/// Attaches the input pipe and the combined output pipe to `command`.
#[cfg(unix)]
pub fn wire_pipes(program: &Path, mut command: Command) -> Result<PreparedCommand, SupervisorError> {
    let (reader, writer) = io::pipe().map_err(|source| SupervisorError::PipeAllocation { source })?;
    let stderr = writer
        .try_clone()
        .map_err(|source| SupervisorError::PipeAllocation { source })?;

    command.stdin(Stdio::piped()).stdout(writer).stderr(stderr);

    Ok(PreparedCommand {
        program: program.to_path_buf(),
        command,
        output: reader,
    })
}

/// Attaches the input pipe and one output pipe per stream to `command`.
#[cfg(not(unix))]
pub fn wire_pipes(program: &Path, mut command: Command) -> Result<PreparedCommand, SupervisorError> {
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    Ok(PreparedCommand {
        program: program.to_path_buf(),
        command,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn stdout_and_stderr_share_one_pipe() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo out; echo err 1>&2"]);
        let prepared = wire_pipes(Path::new("sh"), cmd).unwrap();
        assert_eq!(prepared.program(), Path::new("sh"));

        let (mut child, mut outputs) = prepared.spawn().unwrap();
        assert_eq!(outputs.len(), 1);
        let mut output = outputs.pop().unwrap();
        let status = child.wait().await.unwrap();
        assert!(status.success());

        let mut text = String::new();
        output.read_to_string(&mut text).await.unwrap();
        assert!(text.contains("out"));
        assert!(text.contains("err"));
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let program = Path::new("/nonexistent/hws-agent");
        let prepared = wire_pipes(program, Command::new(program)).unwrap();
        match prepared.spawn() {
            Err(err) => assert_eq!(err.kind(), io::ErrorKind::NotFound),
            Ok(_) => panic!("spawned a missing program"),
        }
    }
}
