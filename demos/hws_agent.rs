//! # Example: hws_agent
//!
//! Runs the hardware agent under supervision until the process receives SIGINT,
//! SIGTERM or SIGQUIT (Ctrl-C on Windows), then shuts it down within the grace period.
//!
//! Shows how to:
//! - Decode an [`AgentConfig`] section from JSON.
//! - Start [`HardwareAgentExtension`] through the [`Extension`] lifecycle and stop it
//!   with [`shutdown_on_signal`].
//! - Observe lifecycle events next to the built-in `tracing` output.
//!
//! ## Flow
//! ```text
//! AgentConfig (JSON) ──► HardwareAgentExtension::new()
//!     ├─► start(host)        → Supervisor spawns the control loop
//!     └─► shutdown_on_signal() → on signal (or self-stop): SIGTERM once, wait up to 5s
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example hws_agent -- '{"executable": "/bin/cat", "retries": 2, "restart_delay": "1s"}'
//! ```
//! The configuration may also come from the `HWS_AGENT_CONFIG` environment variable.

use std::sync::Arc;

use agentvisor::{
    AgentConfig, EventKind, Extension, HardwareAgentExtension, Host, SupervisorError,
    shutdown_on_signal,
};
use tracing_subscriber::EnvFilter;

/// Stands in for the collector: fatal errors end the demo.
struct DemoHost;

impl Host for DemoHost {
    fn report_fatal_error(&self, err: &SupervisorError) {
        tracing::error!(error = %err, label = err.as_label(), "hardware agent failed permanently");
    }
}

fn load_config() -> anyhow::Result<AgentConfig> {
    let raw = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("HWS_AGENT_CONFIG").ok())
        .unwrap_or_else(|| "{}".to_string());
    Ok(serde_json::from_str(&raw)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = load_config()?;
    let ext = HardwareAgentExtension::new(&cfg);
    let mut events = ext.supervisor().subscribe();

    ext.start(Arc::new(DemoHost)).await?;
    println!("supervising agent, args={:?}", ext.supervisor().config().args);

    tokio::spawn(async move {
        while let Ok(ev) = events.recv().await {
            if ev.kind == EventKind::RetriesExhausted {
                println!("agent died after {} attempt(s)", ev.attempt.unwrap_or(0));
            }
        }
    });

    let outcome = shutdown_on_signal(ext.supervisor()).await?;
    println!("shutdown: {outcome:?}, final state: {}", ext.supervisor().state());
    Ok(())
}
