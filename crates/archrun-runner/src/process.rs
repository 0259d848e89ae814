use archrun_switches::{Switches, redact};
use serde::{Deserialize, Serialize};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::command_spec::CommandSpec;
use crate::decode::ChunkDecoder;
use crate::error::RunError;
use crate::handler::{Control, InputAction, ProgressHandler};
use crate::invocation::Invocation;
use crate::session::{Session, Terminate};
use crate::types::{Outcome, StreamSource};

/// Default size of a single pipe read
pub const DEFAULT_READ_BUFFER_BYTES: usize = 8192;

/// Default time between the termination signal and a hard kill
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

// ============================================================================
// Settings
// ============================================================================

/// How a cancelled archiver is stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminateMode {
    /// SIGTERM, then a hard kill once the grace period expires (Unix).
    /// Other platforms always kill.
    #[default]
    Term,
    /// Hard kill immediately
    Kill,
}

impl TerminateMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Term => "term",
            Self::Kill => "kill",
        }
    }
}

/// Tuning for the drive loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Size of a single stdout/stderr read
    pub read_buffer_bytes: usize,
    /// How cancellation stops the process
    pub terminate: TerminateMode,
    /// Time allowed after SIGTERM before a hard kill
    pub kill_grace: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            read_buffer_bytes: DEFAULT_READ_BUFFER_BYTES,
            terminate: TerminateMode::default(),
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }
}

// ============================================================================
// ArchiveRunner
// ============================================================================

/// Runs archiver invocations and settles each into an [`Outcome`].
///
/// The runner itself holds only settings; every run gets its own session
/// (error accumulator, marker, cancellation flag), so one runner can drive any
/// number of concurrent invocations.
///
/// # Example
///
/// ```rust,no_run
/// use archrun_runner::{ArchiveRunner, CancellationToken, Invocation, progress_fn};
/// use archrun_switches::Switches;
///
/// # async fn example() -> Result<(), archrun_runner::RunError> {
/// let runner = ArchiveRunner::default();
/// let invocation = Invocation::new("7z", ["x", "secret.7z"])
///     .switches(Switches::new().assume_yes(true));
///
/// let outcome = runner
///     .run(
///         &invocation,
///         CancellationToken::new(),
///         progress_fn(|chunk, control| {
///             if chunk.contains("Enter password") {
///                 control.write_line("hunter2");
///             }
///             Ok(())
///         }),
///     )
///     .await?;
///
/// if outcome.code != Some(0) || !outcome.errors.is_empty() {
///     eprintln!("archiver reported: {:?}", outcome.errors);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArchiveRunner {
    settings: RunnerSettings,
}

impl ArchiveRunner {
    #[must_use]
    pub const fn new(settings: RunnerSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub const fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// Run `invocation` to completion, reporting stdout chunks to `progress`.
    ///
    /// Cancelling `cancel` (or calling [`Control::cancel`] from the handler)
    /// terminates the archiver; the run still settles with `Ok` and
    /// `cancelled: true` once the process is gone.
    ///
    /// # Errors
    ///
    /// - [`RunError::InvalidArgument`] / [`RunError::InvalidOption`] before spawning
    /// - [`RunError::Spawn`], [`RunError::Read`], [`RunError::Wait`] for process faults
    /// - [`RunError::Handler`] when `progress` returns an error
    pub async fn run<H: ProgressHandler>(
        &self,
        invocation: &Invocation,
        cancel: CancellationToken,
        mut progress: H,
    ) -> Result<Outcome, RunError> {
        let (spec, session) = prepare(invocation)?;
        let child = spawn(&spec)?;
        let span = invocation_span(&spec.program);

        self.drive(child, session, &mut progress, &cancel, None)
            .instrument(span)
            .await
    }

    /// Validate and spawn; the caller keeps a process for [`Self::drive`].
    pub(crate) fn launch(
        &self,
        invocation: &Invocation,
    ) -> Result<(Child, Session, String), RunError> {
        let (spec, session) = prepare(invocation)?;
        let child = spawn(&spec)?;
        Ok((child, session, spec.program))
    }

    /// Consume both output streams until EOF, then wait for the exit status.
    ///
    /// Streams are drained before the status is collected, so every byte the
    /// archiver wrote has been classified when the outcome is built.
    pub(crate) async fn drive<H: ProgressHandler + ?Sized>(
        &self,
        mut child: Child,
        mut session: Session,
        handler: &mut H,
        cancel: &CancellationToken,
        mut input: Option<UnboundedReceiver<InputAction>>,
    ) -> Result<Outcome, RunError> {
        let started = Instant::now();

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| missing_pipe(StreamSource::Stdout))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| missing_pipe(StreamSource::Stderr))?;
        let mut stdin = StdinWriter::new(child.stdin.take());

        let mut stdout_buf = vec![0u8; self.settings.read_buffer_bytes.max(1)];
        let mut stderr_buf = vec![0u8; self.settings.read_buffer_bytes.max(1)];
        let mut stdout_decoder = ChunkDecoder::new();
        let mut stderr_decoder = ChunkDecoder::new();

        let mut stdout_open = true;
        let mut stderr_open = true;
        let mut input_open = input.is_some();
        let mut kill_deadline: Option<Instant> = None;

        while stdout_open || stderr_open {
            tokio::select! {
                read = stdout.read(&mut stdout_buf), if stdout_open => {
                    let chunk = match read {
                        Ok(0) => {
                            stdout_open = false;
                            stdout_decoder.finish().unwrap_or_default()
                        }
                        Ok(n) => stdout_decoder.decode(&stdout_buf[..n]),
                        // Pipe errors after a cancel are part of the teardown.
                        Err(_) if session.is_cancelled() => {
                            stdout_open = false;
                            String::new()
                        }
                        Err(source) => {
                            abort(&mut child).await;
                            return Err(RunError::Read { stream: StreamSource::Stdout, source });
                        }
                    };

                    let control = match feed_stdout(&mut session, handler, &chunk) {
                        Ok(control) => control,
                        Err(err) => {
                            warn!(error = %err, "Progress handler failed; killing archiver");
                            abort(&mut child).await;
                            return Err(err);
                        }
                    };

                    let (actions, cancel_requested) = control.into_parts();
                    if cancel_requested {
                        self.cancel_child(&mut session, &mut child, &mut kill_deadline);
                    }
                    for action in actions {
                        stdin.apply(action);
                    }
                }
                read = stderr.read(&mut stderr_buf), if stderr_open => {
                    let chunk = match read {
                        Ok(0) => {
                            stderr_open = false;
                            stderr_decoder.finish().unwrap_or_default()
                        }
                        Ok(n) => stderr_decoder.decode(&stderr_buf[..n]),
                        Err(_) if session.is_cancelled() => {
                            stderr_open = false;
                            String::new()
                        }
                        Err(source) => {
                            abort(&mut child).await;
                            return Err(RunError::Read { stream: StreamSource::Stderr, source });
                        }
                    };

                    if let Some(message) = session.stderr_chunk(&chunk) {
                        handler.on_error(StreamSource::Stderr, &message);
                    }
                }
                () = cancel.cancelled(), if !session.is_cancelled() => {
                    self.cancel_child(&mut session, &mut child, &mut kill_deadline);
                }
                action = next_input(&mut input), if input_open => {
                    match action {
                        Some(action) => stdin.apply(action),
                        None => input_open = false,
                    }
                }
                () = sleep_until_deadline(kill_deadline), if kill_deadline.is_some() => {
                    kill_deadline = None;
                    debug!("Grace period expired; killing archiver");
                    if let Err(e) = child.start_kill() {
                        debug!(error = %e, "Kill failed; process already exited");
                    }
                }
            }
        }

        drop(stdin);
        let status = child
            .wait()
            .await
            .map_err(|source| RunError::Wait { source })?;

        let outcome = session.into_outcome(status.code());
        info!(
            code = ?outcome.code,
            errors = outcome.errors.len(),
            cancelled = outcome.cancelled,
            duration_ms = %started.elapsed().as_millis(),
            "Archiver run settled"
        );
        Ok(outcome)
    }

    fn cancel_child(
        &self,
        session: &mut Session,
        child: &mut Child,
        kill_deadline: &mut Option<Instant>,
    ) {
        let mut target = ChildTerminator {
            child: &mut *child,
            mode: self.settings.terminate,
        };
        if session.request_cancel(&mut target) && self.settings.terminate == TerminateMode::Term {
            *kill_deadline = Some(Instant::now() + self.settings.kill_grace);
        }
    }
}

/// Span wrapping one archiver run.
#[must_use]
pub fn invocation_span(program: &str) -> tracing::Span {
    info_span!("archiver_run", program = %program)
}

/// Run the archiver once with default settings and a private cancellation token.
///
/// Cancellation is only reachable through [`Control::cancel`] in `progress`.
///
/// # Errors
///
/// See [`ArchiveRunner::run`].
pub async fn invoke<I, S, H>(
    command: impl Into<String>,
    args: I,
    switches: Option<Switches>,
    progress: H,
) -> Result<Outcome, RunError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
    H: ProgressHandler,
{
    let invocation = Invocation {
        switches,
        ..Invocation::new(command, args)
    };
    ArchiveRunner::default()
        .run(&invocation, CancellationToken::new(), progress)
        .await
}

// ============================================================================
// Helpers
// ============================================================================

fn prepare(invocation: &Invocation) -> Result<(CommandSpec, Session), RunError> {
    let spec = invocation.command_spec()?;
    let session = Session::new()?;
    Ok((spec, session))
}

fn spawn(spec: &CommandSpec) -> Result<Child, RunError> {
    let child = spec
        .to_tokio_command()
        .spawn()
        .map_err(|source| RunError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

    debug!(
        program = %spec.program,
        args = ?redact(&spec.args),
        pid = ?child.id(),
        "Spawned archiver"
    );
    Ok(child)
}

/// Forward a stdout chunk to the handler, then scan it for error markers.
fn feed_stdout<H: ProgressHandler + ?Sized>(
    session: &mut Session,
    handler: &mut H,
    chunk: &str,
) -> Result<Control, RunError> {
    let mut control = Control::new();
    if chunk.is_empty() {
        return Ok(control);
    }

    handler
        .on_progress(chunk, &mut control)
        .map_err(RunError::Handler)?;

    for message in session.stdout_chunk(chunk) {
        handler.on_error(StreamSource::Stdout, &message);
    }
    Ok(control)
}

/// Feeds the archiver's stdin from its own task.
///
/// Writes never run inside the drive loop, so a child that stops reading stdin
/// until its stdout is drained cannot stall output reads or cancellation.
struct StdinWriter {
    queue: Option<UnboundedSender<Vec<u8>>>,
    task: Option<JoinHandle<()>>,
}

impl StdinWriter {
    fn new(pipe: Option<ChildStdin>) -> Self {
        let Some(pipe) = pipe else {
            return Self {
                queue: None,
                task: None,
            };
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(write_stdin(pipe, rx).in_current_span());
        Self {
            queue: Some(tx),
            task: Some(task),
        }
    }

    /// Queue a write or close; never blocks.
    fn apply(&mut self, action: InputAction) {
        match action {
            InputAction::Write(bytes) => {
                let Some(queue) = self.queue.as_ref() else {
                    debug!(bytes = bytes.len(), "Stdin already closed; dropping input");
                    return;
                };
                if let Err(rejected) = queue.send(bytes) {
                    debug!(bytes = rejected.0.len(), "Archiver stdin closed; dropping input");
                    self.queue = None;
                }
            }
            // Queued writes still go out before the pipe is dropped.
            InputAction::Close => self.queue = None,
        }
    }
}

// Dropping the writer drops the pipe, discarding anything still queued.
impl Drop for StdinWriter {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn write_stdin(mut pipe: ChildStdin, mut queue: UnboundedReceiver<Vec<u8>>) {
    while let Some(bytes) = queue.recv().await {
        let written = async {
            pipe.write_all(&bytes).await?;
            pipe.flush().await
        }
        .await;
        match written {
            Ok(()) => debug!(bytes = bytes.len(), "Wrote input to archiver"),
            Err(e) => {
                // The archiver stopped reading; later writes would fail the same way.
                debug!(error = %e, "Archiver stdin closed");
                return;
            }
        }
    }
    debug!("Closed archiver stdin");
}

async fn next_input(input: &mut Option<UnboundedReceiver<InputAction>>) -> Option<InputAction> {
    match input {
        Some(rx) => rx.recv().await,
        None => None,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Kill the archiver and reap it before a run fails.
async fn abort(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "Kill failed; process already exited");
    }
    if let Err(e) = child.wait().await {
        debug!(error = %e, "Failed to reap killed archiver");
    }
}

fn missing_pipe(stream: StreamSource) -> RunError {
    RunError::Read {
        stream,
        source: io::Error::other("pipe was not captured"),
    }
}

struct ChildTerminator<'a> {
    child: &'a mut Child,
    mode: TerminateMode,
}

impl Terminate for ChildTerminator<'_> {
    fn terminate(&mut self) -> io::Result<()> {
        match self.mode {
            TerminateMode::Kill => self.child.start_kill(),
            TerminateMode::Term => send_term(self.child),
        }
    }
}

#[cfg(unix)]
fn send_term(child: &mut Child) -> io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    // No pid means the child has already been reaped.
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pid = i32::try_from(pid).map_err(|_| io::Error::other("pid out of range"))?;
    kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn send_term(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}
