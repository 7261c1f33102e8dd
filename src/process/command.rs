//! # Platform command construction.
//!
//! [`BuildCommand`] turns a resolved program path and its argument list into a
//! [`tokio::process::Command`]. There are exactly two variants, chosen at build time
//! by [`platform_default`]:
//!
//! - [`DirectExec`] (Unix): exec the program with its arguments, no shell involved;
//! - [`ShellWrapped`] (Windows): run through `cmd /S /C "<line>"`, quoting every token
//!   that contains whitespace so paths such as `C:\Program Files\...` survive
//!   tokenization. The agent ships as a `.cmd` launcher there, which needs the shell.
//!
//! The environment is inherited from the collector.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::process::Command;

/// Builds the concrete invocation for the target platform.
pub trait BuildCommand: Send + Sync + fmt::Debug + 'static {
    /// Returns a command ready for pipe wiring.
    fn build(&self, program: &Path, args: &[String]) -> Command;
}

/// Direct exec: `program arg1 arg2 ...`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectExec;

impl BuildCommand for DirectExec {
    fn build(&self, program: &Path, args: &[String]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd
    }
}

/// Shell wrapper: `cmd /S /C ""program" arg1 ..."`.
#[derive(Clone, Debug)]
pub struct ShellWrapped {
    shell: PathBuf,
}

impl ShellWrapped {
    /// Uses `shell` as the command interpreter.
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellWrapped {
    fn default() -> Self {
        Self::new("cmd.exe")
    }
}

impl BuildCommand for ShellWrapped {
    fn build(&self, program: &Path, args: &[String]) -> Command {
        // `/S` strips exactly the outer pair of quotes and keeps the rest verbatim.
        let wrapped = format!("\"{}\"", command_line(program, args));
        let mut cmd = Command::new(&self.shell);
        cmd.args(["/S", "/C"]);
        #[cfg(windows)]
        cmd.raw_arg(wrapped);
        #[cfg(not(windows))]
        cmd.arg(wrapped);
        cmd
    }
}

/// Returns the builder for the platform this crate was compiled for.
pub fn platform_default() -> Arc<dyn BuildCommand> {
    #[cfg(windows)]
    {
        Arc::new(ShellWrapped::default())
    }
    #[cfg(not(windows))]
    {
        Arc::new(DirectExec)
    }
}

/// Quotes one token for the shell line if it contains whitespace or quotes.
///
/// Embedded quotes are doubled (`""`), the escape `cmd.exe` recognises.
///
/// # Example
/// ```
/// use agentvisor::process::command::quote_arg;
///
/// assert_eq!(quote_arg("--grpc=localhost:4317"), "--grpc=localhost:4317");
/// assert_eq!(quote_arg(r"C:\Program Files\hws\hws-agent.cmd"), r#""C:\Program Files\hws\hws-agent.cmd""#);
/// ```
pub fn quote_arg(arg: &str) -> Cow<'_, str> {
    if !arg.is_empty() && !arg.chars().any(|c| c.is_whitespace() || c == '"') {
        return Cow::Borrowed(arg);
    }
    Cow::Owned(format!("\"{}\"", arg.replace('"', "\"\"")))
}

/// Joins the program and its arguments into one shell line, quoting as needed.
pub fn command_line(program: &Path, args: &[String]) -> String {
    let program = program.to_string_lossy();
    std::iter::once(quote_arg(&program))
        .chain(args.iter().map(|a| quote_arg(a)))
        .collect::<Vec<_>>()
        .join(" ")
}
