//! Types used by the runner module

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which output stream a piece of text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSource {
    Stdout,
    Stderr,
}

impl StreamSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settled result of one archiver invocation.
///
/// A non-zero `code` is not turned into an error: callers must look at both
/// `code` and `errors`, since archivers sometimes report fatal problems with a
/// zero status and advisory ones with a non-zero status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Exit code (None if terminated by signal)
    pub code: Option<i32>,
    /// Error text in detection order (marker messages and raw stderr chunks)
    pub errors: Vec<String>,
    /// Whether cancellation was requested during the run
    pub cancelled: bool,
}

impl Outcome {
    /// Exit code 0, nothing reported, not cancelled.
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0) && self.errors.is_empty() && !self.cancelled
    }
}

/// Notification emitted by a run started with [`crate::ArchiveRunner::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// A decoded stdout chunk, verbatim
    Progress(String),
    /// An error picked out of stdout or a non-empty stderr chunk
    ErrorDetected {
        source: StreamSource,
        message: String,
    },
    /// The run settled successfully; always the last event
    Done(Outcome),
}
