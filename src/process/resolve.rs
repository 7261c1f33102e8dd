//! # Executable resolution.
//!
//! The supervisor never hard-codes where the agent lives: it asks a
//! [`ResolveExecutable`] delegate before every start attempt, so an agent installed
//! or upgraded while the collector runs is picked up on the next restart.
//!
//! Provided delegates:
//! - [`FixedPath`] an explicit path from configuration;
//! - [`SearchPath`] a program name looked up in `PATH`;
//! - [`InstallRelative`] a path relative to the running collector binary (default).

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::SupervisorError;

/// Default agent location, relative to the directory of the current executable.
#[cfg(windows)]
pub const DEFAULT_AGENT_PATH: &str = "hws-agent.cmd";
/// Default agent location, relative to the directory of the current executable.
#[cfg(not(windows))]
pub const DEFAULT_AGENT_PATH: &str = "hws-agent";

/// Resolves the agent executable to launch.
pub trait ResolveExecutable: Send + Sync + fmt::Debug + 'static {
    /// Returns the absolute (or directly spawnable) program path.
    fn resolve(&self) -> Result<PathBuf, SupervisorError>;
}

/// An explicit program path.
#[derive(Clone, Debug)]
pub struct FixedPath(PathBuf);

impl FixedPath {
    /// Uses `path` as-is.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }
}

impl ResolveExecutable for FixedPath {
    fn resolve(&self) -> Result<PathBuf, SupervisorError> {
        Ok(self.0.clone())
    }
}

/// A program name searched in `PATH`.
#[derive(Clone, Debug)]
pub struct SearchPath {
    name: String,
}

impl SearchPath {
    /// Looks `name` up in `PATH` on every resolution.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ResolveExecutable for SearchPath {
    fn resolve(&self) -> Result<PathBuf, SupervisorError> {
        which::which(&self.name).map_err(|e| SupervisorError::Resolve {
            reason: format!("{}: {e}", self.name),
        })
    }
}

/// A path relative to the directory holding the current executable.
#[derive(Clone, Debug)]
pub struct InstallRelative {
    relative: PathBuf,
}

impl InstallRelative {
    /// Resolves `relative` against the current executable's directory.
    pub fn new(relative: impl Into<PathBuf>) -> Self {
        Self {
            relative: relative.into(),
        }
    }

    fn resolve_from(&self, exe: &Path) -> Result<PathBuf, SupervisorError> {
        let dir = exe.parent().ok_or_else(|| SupervisorError::Resolve {
            reason: format!("{} has no parent directory", exe.display()),
        })?;
        Ok(dir.join(&self.relative))
    }
}

impl Default for InstallRelative {
    fn default() -> Self {
        Self::new(DEFAULT_AGENT_PATH)
    }
}

impl ResolveExecutable for InstallRelative {
    fn resolve(&self) -> Result<PathBuf, SupervisorError> {
        let exe = std::env::current_exe().map_err(|e| SupervisorError::Resolve {
            reason: format!("current executable: {e}"),
        })?;
        self.resolve_from(&exe)
    }
}
