//! archrun - run 7-Zip style archivers from Rust
//!
//! archrun spawns an archiver as a child process, streams its output while it
//! runs, picks `Error:` messages out of stdout, keeps stderr as error text,
//! lets the caller answer prompts or cancel mid-run, and settles each run into
//! a single [`Outcome`].
//!
//! It can be used in two ways:
//! - **CLI**: `archrun run -s y -- x backup.7z`
//! - **Library**: the re-exports below, backed by the `archrun-switches`,
//!   `archrun-runner` and `archrun-config` crates
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use archrun::{Invocation, Switches, invoke, progress_fn};
//!
//! # async fn example() -> Result<(), archrun::RunError> {
//! let switches = Switches::new().output_dir("out").assume_yes(true);
//! let outcome = invoke(
//!     "7z",
//!     ["x", "backup.7z"],
//!     Some(switches),
//!     progress_fn(|chunk, _control| {
//!         print!("{chunk}");
//!         Ok(())
//!     }),
//! )
//! .await?;
//!
//! for error in &outcome.errors {
//!     eprintln!("{error}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod exit_codes;
pub mod logging;

pub use archrun_config::{Config, ConfigBuilder, ConfigError, ConfigSource};
pub use archrun_runner::{
    ArchiveRunner, CancellationToken, Control, ErrorKind, InputAction, Invocation, NoProgress,
    Outcome, ProgressHandler, RunError, RunEvent, RunHandle, RunnerSettings, StreamSource,
    TerminateMode, invoke, progress_fn,
};
pub use archrun_switches::{SwitchError, SwitchValue, Switches, redact, serialize};
pub use exit_codes::ExitCode;
