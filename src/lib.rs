//! # agentvisor
//!
//! **agentvisor** supervises one external hardware-monitoring agent process on behalf
//! of a telemetry collector: it launches the agent, forwards its output to the logging
//! pipeline, restarts it when it dies (within a retry budget) and stops it
//! cooperatively when the host shuts down.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!        ┌───────────────────────────────┐
//!        │  HardwareAgentExtension       │  start(host) / shutdown()
//!        │  (AgentConfig → SupervisorConfig)
//!        └──────────────┬────────────────┘
//!                       ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Supervisor (lifecycle handle)                                │
//! │  - Bus (broadcast events)                                     │
//! │  - cancel token (shutdown request)                            │
//! │  - stopped token (completion marker)                          │
//! │  - watch<SupervisorState>                                     │
//! └──────────────┬────────────────────────────────────────────────┘
//!                ▼ tokio::spawn
//!        ┌────────────────┐  per run   ┌───────────────┐  ┌─────────────┐
//!        │ Machine (loop) │ ─────────► │ ExitWatcher   │  │ output relay│
//!        │ Starting …     │ ◄── once ─ │ (owns Child)  │  │ (blocking)  │
//!        │ Stopped        │  oneshot   └───────────────┘  └──────┬──────┘
//!        └───────┬────────┘                                      ▼
//!                │ publish(Event)                        tracing::debug!(line)
//!                ▼
//!        Bus ──► SubscriberSet ──► LogWriter (tracing) / custom Subscribe
//! ```
//!
//! ### Lifecycle
//! ```text
//! Starting ─ spawn ok ─► Running ─ exit ─► Errored ─ budget ─► Restarting ─ delay ─► Starting
//!    │ spawn failed ────────────────────────► │         └─ exhausted ─► Stopped ("agent died")
//!    └ pipe allocation failed ─► Stopped (fatal, host notified)
//! Running ─ shutdown ─► ShuttingDown ─ SIGTERM once, wait ─► Stopped
//! ```
//!
//! ## Retry budget
//! | `retries` | start attempts     |
//! |-----------|--------------------|
//! | `< 0`     | unlimited          |
//! | `0`       | 1                  |
//! | `N`       | `N + 1`            |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use agentvisor::{AgentConfig, Extension, HardwareAgentExtension, Host, SupervisorError};
//!
//! struct Collector;
//! impl Host for Collector {
//!     fn report_fatal_error(&self, err: &SupervisorError) {
//!         eprintln!("hardware agent failed: {err}");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SupervisorError> {
//!     let cfg: AgentConfig = serde_json::from_str(r#"{ "grpc": "localhost:4317", "retries": 5 }"#)
//!         .expect("valid config");
//!     let ext = HardwareAgentExtension::new(&cfg);
//!
//!     ext.start(Arc::new(Collector)).await?;
//!     let outcome = agentvisor::shutdown_on_signal(ext.supervisor()).await.ok();
//!     println!("agent stopped: {outcome:?}");
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod extension;
mod policies;

pub mod events;
pub mod process;
pub mod subscribers;

// ---- Public re-exports ----

pub use config::{AgentConfig, DEFAULT_AGENT_NAME, SHUTDOWN_GRACE, SupervisorConfig};
pub use core::{
    ShutdownOutcome, Supervisor, SupervisorBuilder, SupervisorState, shutdown_on_signal,
};
pub use error::SupervisorError;
pub use events::{Event, EventKind};
pub use extension::{Extension, HardwareAgentExtension, Host};
pub use policies::{DEFAULT_RESTART_DELAY, DEFAULT_RETRIES, RestartPolicy, RetryBudget};
pub use process::{FixedPath, InstallRelative, ResolveExecutable, SearchPath};
pub use subscribers::{LogWriter, Subscribe};
