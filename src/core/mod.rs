//! Supervision core: the agent control loop and its lifecycle handle.
//!
//! The only public API from this module is [`Supervisor`] (with its builder,
//! [`SupervisorState`] and [`ShutdownOutcome`]) plus [`shutdown_on_signal`].
//!
//! Internal modules:
//! - [`machine`]: the state machine driving one agent through start, crash, restart and stop;
//! - [`supervisor`]: start/shutdown facade, grace period, observation channels;
//! - [`shutdown`]: stops the supervisor when the host process is told to terminate.

mod builder;
mod machine;
mod shutdown;
mod state;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use shutdown::shutdown_on_signal;
pub use state::SupervisorState;
pub use supervisor::{ShutdownOutcome, Supervisor};
