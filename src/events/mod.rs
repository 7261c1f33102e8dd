//! Supervisor events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the control loop and the
//! shutdown path.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `core::machine::Machine`, `Supervisor::shutdown`.
//! - **Consumers**: the subscriber listener (fans out to [`Subscribe`](crate::Subscribe)
//!   implementations such as [`LogWriter`](crate::LogWriter)) and
//!   [`Supervisor::subscribe`](crate::Supervisor::subscribe) receivers.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
