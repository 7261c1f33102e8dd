//! Child-process plumbing.
//!
//! Everything that touches the OS process lives here; the control loop in
//! only sees the handles these modules return.
//!
//! - [`resolve`]: executable resolution delegates ([`ResolveExecutable`]);
//! - [`command`]: platform command construction ([`BuildCommand`], direct exec vs shell wrapper);
//! - [`pipes`]: stdin pipe plus the output pipe(s) of one run;
//! - [`relay`]: forwards child output lines to `tracing` at debug level;
//! - [`watcher`]: owns the child, reports its exit exactly once.
//!
//! ## One run
//! ```text
//! resolve() ─► build(program, args) ─► wire_pipes() ─► spawn()
//!                                                         ├─► stdout+stderr ─► relay task
//!                                                         └─► Child ─► watcher ─► oneshot<ExitOutcome>
//! ```

pub mod command;
pub mod pipes;
pub mod relay;
pub mod resolve;
pub mod watcher;

pub use command::{BuildCommand, DirectExec, ShellWrapped, platform_default};
pub use pipes::{OutputStream, PreparedCommand, wire_pipes};
pub use resolve::{FixedPath, InstallRelative, ResolveExecutable, SearchPath};
pub use watcher::{ExitOutcome, ExitWatcher};
