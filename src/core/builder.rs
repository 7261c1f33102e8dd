use std::sync::Arc;

use super::supervisor::Supervisor;
use crate::config::SupervisorConfig;
use crate::subscribers::{LogWriter, Subscribe};

/// Builder for constructing a [`Supervisor`] with optional observers.
///
/// A [`LogWriter`] is attached unless [`SupervisorBuilder::without_log_writer`] is
/// called, so lifecycle events reach `tracing` by default.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    log_writer: bool,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            log_writer: true,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive lifecycle events through dedicated workers with bounded
    /// queues; the fan-out starts with [`Supervisor::start`].
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Drops the default [`LogWriter`].
    pub fn without_log_writer(mut self) -> Self {
        self.log_writer = false;
        self
    }

    /// Builds the supervisor. Nothing runs until [`Supervisor::start`].
    pub fn build(self) -> Supervisor {
        let mut subscribers = self.subscribers;
        if self.log_writer {
            subscribers.insert(0, Arc::new(LogWriter::new()));
        }
        Supervisor::new_internal(self.cfg, subscribers)
    }
}
