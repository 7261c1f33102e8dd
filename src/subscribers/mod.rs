//! # Event subscribers for the supervisor.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and the
//! built-in [`LogWriter`] that forwards lifecycle events to `tracing`.
//!
//! ## Architecture
//! ```text
//! Machine ── publish(Event) ──► Bus ──► SubscriberSet::listen
//!                                              │
//!                                    ┌─────────┼─────────┐
//!                                    ▼         ▼         ▼
//!                                LogWriter   Custom     ...
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use agentvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct CrashCounter;
//!
//! #[async_trait]
//! impl Subscribe for CrashCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::ProcessExited {
//!             // increment crash counter
//!         }
//!     }
//! }
//! ```

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
