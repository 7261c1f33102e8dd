//! # Lifecycle facade.
//!
//! The host (a telemetry collector) drives components through [`Extension`]: `start`
//! once when the pipeline comes up, `shutdown` once when it goes down. The
//! [`HardwareAgentExtension`] builds its [`Supervisor`] from the user-facing
//! [`AgentConfig`] and forwards both calls.
//!
//! ```text
//! host ── start(host) ──► HardwareAgentExtension ──► Supervisor::start(Some(host))
//! host ── shutdown()  ──► HardwareAgentExtension ──► Supervisor::shutdown()  (always Ok)
//!                                 ▲
//!       Host::report_fatal_error ─┘  (pipe allocation failure on a restart)
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AgentConfig;
use crate::core::{ShutdownOutcome, Supervisor};
use crate::error::SupervisorError;

/// Services the host offers to a running component.
pub trait Host: Send + Sync {
    /// Called when the component stops on an error it cannot recover from.
    fn report_fatal_error(&self, err: &SupervisorError);
}

/// A component with a host-driven lifecycle.
#[async_trait]
pub trait Extension: Send + Sync {
    /// Starts the component. Must not block on the work it launches.
    async fn start(&self, host: Arc<dyn Host>) -> Result<(), SupervisorError>;

    /// Stops the component.
    async fn shutdown(&self) -> Result<(), SupervisorError>;
}

/// Runs the hardware-monitoring agent under supervision.
pub struct HardwareAgentExtension {
    supervisor: Supervisor,
}

impl HardwareAgentExtension {
    /// Builds the extension from its configuration section.
    ///
    /// Lifecycle events are written to `tracing` by the supervisor's default
    /// [`LogWriter`](crate::LogWriter).
    pub fn new(cfg: &AgentConfig) -> Self {
        Self {
            supervisor: Supervisor::new(cfg.resolve()),
        }
    }

    /// Wraps an already configured supervisor.
    pub fn from_supervisor(supervisor: Supervisor) -> Self {
        Self { supervisor }
    }

    /// The underlying supervisor, for observation.
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }
}

#[async_trait]
impl Extension for HardwareAgentExtension {
    async fn start(&self, host: Arc<dyn Host>) -> Result<(), SupervisorError> {
        self.supervisor.start(Some(host))
    }

    async fn shutdown(&self) -> Result<(), SupervisorError> {
        if self.supervisor.shutdown().await == ShutdownOutcome::GraceExceeded {
            tracing::warn!(
                agent = &*self.supervisor.config().name,
                "returning from shutdown with the agent still running"
            );
        }
        Ok(())
    }
}
