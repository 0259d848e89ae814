//! Archiver process runner
//!
//! Spawns an external archiver, streams its stdout and stderr concurrently,
//! picks `Error:` messages out of the output, lets the caller answer prompts or
//! cancel mid-run, and settles into a single [`Outcome`] once the process is gone.
//!
//! Two front ends share one drive loop:
//! - [`ArchiveRunner::run`] with a [`ProgressHandler`] callback
//! - [`ArchiveRunner::start`] returning a [`RunHandle`] that yields [`RunEvent`]s
//!
//! # Security Model
//!
//! All process execution goes through [`CommandSpec`] to ensure argv-style invocation.
//! Arguments are passed as discrete elements and never through a shell.

pub mod command_spec;
pub mod decode;
pub mod error;
pub mod handle;
pub mod handler;
pub mod invocation;
pub mod marker;
pub mod process;
mod session;
pub mod types;

pub use command_spec::CommandSpec;
pub use error::{ErrorKind, RunError};
pub use handle::RunHandle;
pub use handler::{Control, InputAction, NoProgress, ProgressHandler, progress_fn};
pub use invocation::Invocation;
pub use marker::ErrorMarker;
pub use process::{ArchiveRunner, RunnerSettings, TerminateMode, invocation_span, invoke};
pub use types::{Outcome, RunEvent, StreamSource};

// Re-exported so callers do not need a direct tokio-util dependency.
pub use tokio_util::sync::CancellationToken;
