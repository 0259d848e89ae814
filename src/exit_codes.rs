//! Exit codes for the archrun binary
//!
//! A settled run passes the archiver's own exit code through. The codes below
//! cover the cases where there is no archiver code to pass on.

use archrun_config::ConfigError;
use archrun_runner::{ErrorKind, Outcome, RunError};
use archrun_switches::SwitchError;

/// Process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Archiver killed by a signal without reporting a code
    pub const SIGNALED: ExitCode = ExitCode(1);

    /// Invalid command line, switches, or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Run cancelled because `--timeout` expired
    pub const TIMEOUT: ExitCode = ExitCode(10);

    /// Spawn, I/O, handler, or internal failure
    pub const FAULT: ExitCode = ExitCode(70);

    /// Exit code reported by the archiver itself.
    #[must_use]
    pub const fn from_tool(code: i32) -> Self {
        Self(code)
    }

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Map a settled outcome to the process exit code.
    ///
    /// The CLI only cancels on timeout, so a cancelled outcome maps to
    /// [`ExitCode::TIMEOUT`] even when the archiver managed to exit with a code.
    #[must_use]
    pub const fn from_outcome(outcome: &Outcome) -> Self {
        if outcome.cancelled {
            return Self::TIMEOUT;
        }
        match outcome.code {
            Some(code) => Self(code),
            None => Self::SIGNALED,
        }
    }

    /// Map a failure surfaced through `anyhow` to an exit code.
    #[must_use]
    pub fn from_error(err: &anyhow::Error) -> Self {
        if let Some(run) = err.downcast_ref::<RunError>() {
            return Self::from(run);
        }
        if err.downcast_ref::<ConfigError>().is_some()
            || err.downcast_ref::<SwitchError>().is_some()
            || err.downcast_ref::<std::env::VarError>().is_some()
        {
            return Self::CLI_ARGS;
        }
        Self::FAULT
    }
}

impl From<&RunError> for ExitCode {
    fn from(err: &RunError) -> Self {
        match err.kind() {
            ErrorKind::InvalidArgument | ErrorKind::InvalidOption => Self::CLI_ARGS,
            ErrorKind::SpawnFault | ErrorKind::HandlerFault | ErrorKind::Internal => Self::FAULT,
        }
    }
}
