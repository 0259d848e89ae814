//! Event-stream front end for a running archiver

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::RunError;
use crate::handler::{Control, InputAction, ProgressHandler};
use crate::invocation::Invocation;
use crate::process::{ArchiveRunner, invocation_span};
use crate::types::{Outcome, RunEvent, StreamSource};

/// Handle to an archiver run started with [`ArchiveRunner::start`].
///
/// Output arrives as [`RunEvent`]s in the order the runner classified it. Input
/// for the archiver's stdin and cancellation go through the handle. Dropping the
/// handle does not stop the archiver; call [`RunHandle::cancel`] first.
///
/// # Example
///
/// ```rust,no_run
/// use archrun_runner::{ArchiveRunner, Invocation, RunEvent};
///
/// # async fn example() -> Result<(), archrun_runner::RunError> {
/// let mut run = ArchiveRunner::default().start(&Invocation::new("7z", ["x", "locked.7z"]))?;
///
/// while let Some(event) = run.next_event().await {
///     match event {
///         RunEvent::Progress(text) if text.contains("Enter password") => {
///             run.write_line("hunter2");
///         }
///         RunEvent::ErrorDetected { message, .. } => eprintln!("{message}"),
///         RunEvent::Done(outcome) => println!("exit code {:?}", outcome.code),
///         RunEvent::Progress(_) => {}
///     }
/// }
///
/// let outcome = run.wait().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RunHandle {
    events: UnboundedReceiver<RunEvent>,
    input: UnboundedSender<InputAction>,
    cancel: CancellationToken,
    task: JoinHandle<Result<Outcome, RunError>>,
}

impl RunHandle {
    /// Next event, or `None` once the run has settled and all events were read.
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Queue bytes for the archiver's stdin. Returns false once the run has settled.
    pub fn write_input(&self, bytes: impl Into<Vec<u8>>) -> bool {
        self.input.send(InputAction::Write(bytes.into())).is_ok()
    }

    /// Queue a line (newline appended) for the archiver's stdin.
    pub fn write_line(&self, line: &str) -> bool {
        self.write_input(format!("{line}\n"))
    }

    /// Close the archiver's stdin after queued writes.
    pub fn close_input(&self) -> bool {
        self.input.send(InputAction::Close).is_ok()
    }

    /// Request termination. Repeated calls are no-ops.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this run, e.g. for a caller-side timeout.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to settle. Unread events are discarded.
    ///
    /// # Errors
    ///
    /// The run's own error, or [`RunError::Task`] if the runner task panicked.
    pub async fn wait(self) -> Result<Outcome, RunError> {
        self.task.await?
    }
}

/// Forwards handler callbacks into the event channel.
struct ChannelHandler {
    events: UnboundedSender<RunEvent>,
}

impl ProgressHandler for ChannelHandler {
    fn on_progress(&mut self, chunk: &str, _control: &mut Control) -> anyhow::Result<()> {
        // A closed receiver means nobody is listening; the run continues regardless.
        let _ = self.events.send(RunEvent::Progress(chunk.to_string()));
        Ok(())
    }

    fn on_error(&mut self, source: StreamSource, message: &str) {
        let _ = self.events.send(RunEvent::ErrorDetected {
            source,
            message: message.to_string(),
        });
    }
}

impl ArchiveRunner {
    /// Spawn `invocation` and return a handle streaming its events.
    ///
    /// Must be called from within a Tokio runtime. Validation and spawn errors
    /// are returned here; everything after that settles through the handle.
    ///
    /// # Errors
    ///
    /// [`RunError::InvalidArgument`], [`RunError::InvalidOption`] or
    /// [`RunError::Spawn`].
    pub fn start(&self, invocation: &Invocation) -> Result<RunHandle, RunError> {
        let (child, session, program) = self.launch(invocation)?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let runner = self.clone();
        let token = cancel.clone();
        let span = invocation_span(&program);
        let task = tokio::spawn(
            async move {
                let mut handler = ChannelHandler { events: event_tx };
                let result = runner
                    .drive(child, session, &mut handler, &token, Some(input_rx))
                    .await;
                if let Ok(ref outcome) = result {
                    let _ = handler.events.send(RunEvent::Done(outcome.clone()));
                }
                result
            }
            .instrument(span),
        );

        Ok(RunHandle {
            events: event_rx,
            input: input_tx,
            cancel,
            task,
        })
    }
}
