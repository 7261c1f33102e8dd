//! # Supervisor configuration.
//!
//! Two layers:
//! - [`AgentConfig`] the user-facing section as decoded by `serde` from the host's
//!   configuration (every field optional);
//! - [`SupervisorConfig`] the immutable policy the control loop runs with, built once
//!   by the lifecycle facade and never mutated afterwards.
//!
//! ## Sentinel values
//! - `retries < 0` → unlimited restarts (default `-1`)
//! - `restart_delay` absent or `0s` → [`DEFAULT_RESTART_DELAY`]
//!
//! ## Example
//! ```
//! use std::time::Duration;
//! use agentvisor::AgentConfig;
//!
//! let cfg: AgentConfig = serde_json::from_str(
//!     r#"{ "extra_args": ["--debug"], "grpc": "localhost:4317", "restart_delay": "30s", "retries": 3 }"#,
//! ).unwrap();
//! assert_eq!(cfg.restart_delay, Some(Duration::from_secs(30)));
//! assert_eq!(cfg.retries, Some(3));
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::policies::{DEFAULT_RESTART_DELAY, RestartPolicy};
use crate::process::{BuildCommand, FixedPath, InstallRelative, ResolveExecutable, platform_default};

/// Maximum time `shutdown` waits for the agent to stop.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Name used in events and log records.
pub const DEFAULT_AGENT_NAME: &str = "hws-agent";

/// Agent section of the host configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Arguments appended literally to the agent invocation.
    pub extra_args: Vec<String>,
    /// gRPC endpoint handed to the agent as `--grpc=<value>`.
    pub grpc: Option<String>,
    /// Pause before each restart, as a humantime string (`"10s"`, `"500ms"`).
    #[serde(with = "humantime_opt")]
    pub restart_delay: Option<Duration>,
    /// Restart budget (`-1` = unlimited, `0` = never restart).
    pub retries: Option<i64>,
    /// Explicit agent executable; defaults to the install-relative location.
    pub executable: Option<PathBuf>,
}

/// Immutable supervision policy.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Agent name for events and logs.
    pub name: Arc<str>,
    /// Executable resolution delegate, consulted before every start attempt.
    pub resolver: Arc<dyn ResolveExecutable>,
    /// Platform command builder.
    pub command: Arc<dyn BuildCommand>,
    /// Full argument list passed to the agent.
    pub args: Vec<String>,
    /// Restart delay and retry budget.
    pub restart: RestartPolicy,
    /// How long `shutdown` waits before giving up.
    pub grace: Duration,
    /// Capacity of the event bus ring buffer (min 1).
    pub bus_capacity: usize,
}

impl SupervisorConfig {
    /// Creates a configuration with default policy for the given resolver.
    ///
    /// - `restart = RestartPolicy::default()` (10s, unlimited)
    /// - `grace = 5s`
    /// - `command = platform_default()`
    pub fn new(resolver: impl ResolveExecutable) -> Self {
        Self {
            name: Arc::from(DEFAULT_AGENT_NAME),
            resolver: Arc::new(resolver),
            command: platform_default(),
            args: Vec::new(),
            restart: RestartPolicy::default(),
            grace: SHUTDOWN_GRACE,
            bus_capacity: 1024,
        }
    }

    /// Sets the agent name.
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the argument list.
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the restart policy.
    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    /// Sets the shutdown grace period.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Replaces the platform command builder.
    pub fn with_command(mut self, command: Arc<dyn BuildCommand>) -> Self {
        self.command = command;
        self
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self::new(InstallRelative::default())
    }
}

impl AgentConfig {
    /// Restart delay with the default substituted for an absent or zero value.
    pub fn effective_restart_delay(&self) -> Duration {
        match self.restart_delay {
            Some(d) if !d.is_zero() => d,
            _ => DEFAULT_RESTART_DELAY,
        }
    }

    /// Retry setting with the unlimited default substituted.
    pub fn effective_retries(&self) -> i64 {
        self.retries.unwrap_or(crate::policies::DEFAULT_RETRIES)
    }

    /// Agent invocation arguments: `extra_args` followed by `--grpc=<value>`.
    pub fn agent_args(&self) -> Vec<String> {
        let mut args = self.extra_args.clone();
        if let Some(grpc) = &self.grpc {
            args.push(format!("--grpc={grpc}"));
        }
        args
    }

    /// Produces the immutable supervision policy, applying every default.
    pub fn resolve(&self) -> SupervisorConfig {
        let base = match &self.executable {
            Some(path) => SupervisorConfig::new(FixedPath::new(path)),
            None => SupervisorConfig::new(InstallRelative::default()),
        };
        base.with_args(self.agent_args()).with_restart(RestartPolicy::new(
            self.effective_restart_delay(),
            self.effective_retries(),
        ))
    }
}

mod humantime_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_section_uses_defaults() {
        let cfg: AgentConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, AgentConfig::default());
        assert_eq!(cfg.effective_restart_delay(), Duration::from_secs(10));
        assert_eq!(cfg.effective_retries(), -1);
    }

    #[test]
    fn zero_delay_falls_back_to_default() {
        let cfg: AgentConfig = serde_json::from_str(r#"{ "restart_delay": "0s" }"#).unwrap();
        assert_eq!(cfg.effective_restart_delay(), DEFAULT_RESTART_DELAY);
    }

    #[test]
    fn explicit_values_are_kept() {
        let cfg: AgentConfig =
            serde_json::from_str(r#"{ "restart_delay": "200ms", "retries": 0 }"#).unwrap();
        assert_eq!(cfg.effective_restart_delay(), Duration::from_millis(200));
        assert_eq!(cfg.effective_retries(), 0);
    }

    #[test]
    fn invalid_duration_is_rejected() {
        let err = serde_json::from_str::<AgentConfig>(r#"{ "restart_delay": "soon" }"#).unwrap_err();
        assert!(err.to_string().contains("soon") || err.is_data());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<AgentConfig>(r#"{ "retry": 3 }"#).is_err());
    }

    #[test]
    fn grpc_is_appended_after_extra_args() {
        let cfg: AgentConfig = serde_json::from_str(
            r#"{ "extra_args": ["--log-level", "debug"], "grpc": "127.0.0.1:4317" }"#,
        )
        .unwrap();
        assert_eq!(
            cfg.agent_args(),
            vec!["--log-level", "debug", "--grpc=127.0.0.1:4317"]
        );
    }

    #[test]
    fn resolve_applies_defaults() {
        let resolved = AgentConfig {
            executable: Some(PathBuf::from("/opt/hws/bin/hws-agent")),
            ..AgentConfig::default()
        }
        .resolve();
        assert_eq!(resolved.restart, RestartPolicy::default());
        assert_eq!(resolved.grace, SHUTDOWN_GRACE);
        assert!(resolved.args.is_empty());
        assert_eq!(
            resolved.resolver.resolve().unwrap(),
            PathBuf::from("/opt/hws/bin/hws-agent")
        );
    }

    #[test]
    fn resolve_keeps_retry_budget() {
        let cfg = AgentConfig {
            retries: Some(2),
            restart_delay: Some(Duration::from_millis(250)),
            ..AgentConfig::default()
        };
        let restart = cfg.resolve().restart;
        assert_eq!(restart.delay, Duration::from_millis(250));
        assert_eq!(restart.max_attempts(), Some(3));
    }

    #[test]
    fn supervisor_defaults() {
        let cfg = SupervisorConfig::default();
        assert_eq!(cfg.grace, SHUTDOWN_GRACE);
        assert_eq!(&*cfg.name, DEFAULT_AGENT_NAME);
        assert!(cfg.args.is_empty());
        assert_eq!(SupervisorConfig { bus_capacity: 0, ..cfg }.bus_capacity_clamped(), 1);
    }
}
