//! Error types for runner module

use archrun_switches::SwitchError;
use thiserror::Error;

use crate::types::StreamSource;

/// Failure categories for a single invocation.
///
/// Text the archiver itself reports (marker lines, stderr) is not an error here;
/// it is returned as data in [`crate::Outcome::errors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed program or arguments, detected before spawning
    InvalidArgument,
    /// Malformed switches, detected before spawning
    InvalidOption,
    /// The OS could not start the process, or process I/O failed
    SpawnFault,
    /// The caller's progress handler returned an error
    HandlerFault,
    /// Runner-internal failure (pattern compilation, task panics)
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::InvalidOption => "invalid_option",
            Self::SpawnFault => "spawn_fault",
            Self::HandlerFault => "handler_fault",
            Self::Internal => "internal",
        }
    }
}

/// Archiver invocation errors
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Invalid switch: {0}")]
    InvalidOption(#[from] SwitchError),

    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {stream}: {source}")]
    Read {
        stream: StreamSource,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for process: {source}")]
    Wait {
        #[source]
        source: std::io::Error,
    },

    #[error("Progress handler failed: {0:#}")]
    Handler(anyhow::Error),

    #[error("Error marker pattern is invalid: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Runner task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl RunError {
    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::InvalidOption(_) => ErrorKind::InvalidOption,
            Self::Spawn { .. } | Self::Read { .. } | Self::Wait { .. } => ErrorKind::SpawnFault,
            Self::Handler(_) => ErrorKind::HandlerFault,
            Self::Pattern(_) | Self::Task(_) => ErrorKind::Internal,
        }
    }

    /// The error returned by the progress handler, if this is a handler fault.
    #[must_use]
    pub fn handler_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Handler(err) => Some(err),
            _ => None,
        }
    }
}
