//! Per-invocation classification state
//!
//! A `Session` owns the error accumulator, the error marker and the cancellation
//! flag of exactly one run. It performs no I/O; the drive loop feeds it decoded
//! chunks and asks it to cancel through a [`Terminate`] target.

use std::io;
use tracing::{debug, warn};

use crate::error::RunError;
use crate::marker::ErrorMarker;
use crate::types::Outcome;

/// Something that can be asked to stop, normally the running archiver.
pub(crate) trait Terminate {
    fn terminate(&mut self) -> io::Result<()>;
}

#[derive(Debug)]
pub(crate) struct Session {
    marker: ErrorMarker,
    errors: Vec<String>,
    cancelled: bool,
}

impl Session {
    pub(crate) fn new() -> Result<Self, RunError> {
        Ok(Self {
            marker: ErrorMarker::new()?,
            errors: Vec::new(),
            cancelled: false,
        })
    }

    /// Record marker messages found in a stdout chunk and return them.
    pub(crate) fn stdout_chunk(&mut self, chunk: &str) -> Vec<String> {
        let found = self.marker.messages(chunk);
        self.errors.extend(found.iter().cloned());
        found
    }

    /// Record a non-empty stderr chunk verbatim and return it.
    pub(crate) fn stderr_chunk(&mut self, chunk: &str) -> Option<String> {
        if chunk.is_empty() {
            return None;
        }
        self.errors.push(chunk.to_string());
        Some(chunk.to_string())
    }

    /// Set the cancellation flag and terminate `target` the first time only.
    ///
    /// Returns true when this call sent the termination request.
    pub(crate) fn request_cancel<T: Terminate>(&mut self, target: &mut T) -> bool {
        if self.cancelled {
            return false;
        }
        self.cancelled = true;

        if let Err(e) = target.terminate() {
            // The process may already be gone; its exit is still observed by the drive loop.
            warn!(error = %e, "Failed to signal archiver for cancellation");
        } else {
            debug!("Termination signal sent");
        }
        true
    }

    pub(crate) const fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub(crate) fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub(crate) fn into_outcome(self, code: Option<i32>) -> Outcome {
        Outcome {
            code,
            errors: self.errors,
            cancelled: self.cancelled,
        }
    }
}
