//! Progress callbacks and the control surface handed to them

use crate::types::StreamSource;

/// Input queued for the archiver's stdin by a progress handler or a [`crate::RunHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Write these bytes to stdin
    Write(Vec<u8>),
    /// Close stdin so the archiver sees end-of-file
    Close,
}

/// What a progress handler may do in response to a chunk of output.
///
/// Requests are collected while the handler runs and carried out by the runner
/// afterwards: input is written to the archiver's stdin in order, and a cancel
/// request sends the termination signal. Cancelling more than once is harmless;
/// the signal is only sent the first time.
#[derive(Debug, Default)]
pub struct Control {
    input: Vec<InputAction>,
    cancel_requested: bool,
}

impl Control {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw bytes for the archiver's stdin.
    pub fn write(&mut self, bytes: impl Into<Vec<u8>>) {
        self.input.push(InputAction::Write(bytes.into()));
    }

    /// Queue a line (newline appended), e.g. a password answer.
    pub fn write_line(&mut self, line: &str) {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.write(bytes);
    }

    /// Close the archiver's stdin after any queued writes.
    pub fn close_input(&mut self) {
        self.input.push(InputAction::Close);
    }

    /// Ask the runner to terminate the archiver.
    pub fn cancel(&mut self) {
        self.cancel_requested = true;
    }

    #[must_use]
    pub const fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    /// Input queued so far, in write order.
    #[must_use]
    pub fn pending_input(&self) -> &[InputAction] {
        &self.input
    }

    pub(crate) fn into_parts(self) -> (Vec<InputAction>, bool) {
        (self.input, self.cancel_requested)
    }
}

/// Receives archiver output while a run is in progress.
///
/// `on_progress` gets every decoded stdout chunk verbatim, before the chunk is
/// scanned for error markers. Returning `Err` kills the archiver and fails the
/// run with [`crate::RunError::Handler`] carrying that error.
///
/// Any `FnMut(&str, &mut Control) -> anyhow::Result<()>` closure is a handler.
pub trait ProgressHandler {
    /// Called once per stdout chunk.
    ///
    /// # Errors
    ///
    /// Any error aborts the run.
    fn on_progress(&mut self, chunk: &str, control: &mut Control) -> anyhow::Result<()>;

    /// Called for each error added to the outcome, in detection order.
    fn on_error(&mut self, _source: StreamSource, _message: &str) {}
}

impl<F> ProgressHandler for F
where
    F: FnMut(&str, &mut Control) -> anyhow::Result<()>,
{
    fn on_progress(&mut self, chunk: &str, control: &mut Control) -> anyhow::Result<()> {
        self(chunk, control)
    }
}

/// Handler that ignores all output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressHandler for NoProgress {
    fn on_progress(&mut self, _chunk: &str, _control: &mut Control) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Pin a closure to the handler signature so its argument types are inferred.
pub fn progress_fn<F>(f: F) -> F
where
    F: FnMut(&str, &mut Control) -> anyhow::Result<()>,
{
    f
}
