//! End-to-end runner tests against small `sh` scripts standing in for the archiver.
//!
//! Scripts that must outlive a cancel use `exec` so the shell is replaced and no
//! grandchild keeps the output pipes open.

#![cfg(unix)]

use anyhow::anyhow;
use archrun::{
    ArchiveRunner, CancellationToken, Control, ErrorKind, Invocation, NoProgress, ProgressHandler,
    RunError, RunEvent, RunnerSettings, StreamSource, Switches, TerminateMode, invoke, progress_fn,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;

const SETTLE_LIMIT: Duration = Duration::from_secs(20);

fn script(body: &str) -> Invocation {
    Invocation::new("sh", ["-c", body])
}

fn fast_runner() -> ArchiveRunner {
    ArchiveRunner::new(RunnerSettings {
        kill_grace: Duration::from_millis(200),
        ..RunnerSettings::default()
    })
}

/// Records everything it is shown; clones share the same log.
#[derive(Clone, Default)]
struct Recorder {
    log: Arc<Mutex<Seen>>,
}

#[derive(Default)]
struct Seen {
    progress: String,
    errors: Vec<(StreamSource, String)>,
}

impl ProgressHandler for Recorder {
    fn on_progress(&mut self, chunk: &str, _control: &mut Control) -> anyhow::Result<()> {
        self.log.lock().unwrap().progress.push_str(chunk);
        Ok(())
    }

    fn on_error(&mut self, source: StreamSource, message: &str) {
        self.log
            .lock()
            .unwrap()
            .errors
            .push((source, message.to_string()));
    }
}

#[tokio::test]
async fn test_marker_message_and_exit_code() {
    let outcome = invoke(
        "sh",
        ["-c", "printf 'Error: disk full\\n'; exit 2"],
        None,
        NoProgress,
    )
    .await
    .unwrap();

    assert_eq!(outcome.code, Some(2));
    assert_eq!(outcome.errors, vec!["disk full"]);
    assert!(!outcome.cancelled);
}

#[tokio::test]
async fn test_marker_on_its_own_line() {
    let outcome = invoke(
        "sh",
        ["-c", "printf 'Scanning\\nError:\\nCan not open the file as archive\\n'; exit 2"],
        None,
        NoProgress,
    )
    .await
    .unwrap();

    assert_eq!(outcome.errors, vec!["Can not open the file as archive"]);
}

#[tokio::test]
async fn test_progress_receives_exact_stdout() {
    let mut seen = String::new();
    let outcome = ArchiveRunner::default()
        .run(
            &script("printf 'Extracting a.txt\\nExtracting b.txt\\nEverything is Ok\\n'"),
            CancellationToken::new(),
            progress_fn(|chunk, _control| {
                seen.push_str(chunk);
                Ok(())
            }),
        )
        .await
        .unwrap();

    assert_eq!(outcome.code, Some(0));
    assert!(outcome.errors.is_empty());
    assert!(outcome.success());
    assert_eq!(seen, "Extracting a.txt\nExtracting b.txt\nEverything is Ok\n");
}

#[tokio::test]
async fn test_stderr_is_kept_verbatim() {
    let recorder = Recorder::default();
    let outcome = ArchiveRunner::default()
        .run(
            &script("printf 'boom\\n' >&2"),
            CancellationToken::new(),
            recorder.clone(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.code, Some(0));
    assert_eq!(outcome.errors, vec!["boom\n"]);
    let seen = recorder.log.lock().unwrap();
    assert_eq!(seen.errors, vec![(StreamSource::Stderr, "boom\n".to_string())]);
    assert!(seen.progress.is_empty());
}

#[tokio::test]
async fn test_output_written_just_before_exit_is_not_lost() {
    // Exit immediately after writing; draining before settling must still see it.
    let outcome = invoke(
        "sh",
        ["-c", "printf 'Error: late\\n'; printf 'late stderr' >&2; exit 1"],
        None,
        NoProgress,
    )
    .await
    .unwrap();

    assert_eq!(outcome.code, Some(1));
    assert!(outcome.errors.contains(&"late".to_string()));
    assert!(outcome.errors.contains(&"late stderr".to_string()));
}

#[tokio::test]
async fn test_switches_are_appended_after_args() {
    let mut seen = String::new();
    // "$@" holds whatever follows the script name, i.e. the serialized switches.
    let invocation = Invocation::new("sh", ["-c", "printf '%s\\n' \"$@\"", "archiver"])
        .switches(Switches::new().password("pw").assume_yes(true).raw(["-bb1"]));

    ArchiveRunner::default()
        .run(
            &invocation,
            CancellationToken::new(),
            progress_fn(|chunk, _| {
                seen.push_str(chunk);
                Ok(())
            }),
        )
        .await
        .unwrap();

    assert_eq!(seen, "-ppw\n-y\n-bb1\n");
}

#[tokio::test]
async fn test_cancel_from_progress_is_idempotent() {
    let mut calls = 0usize;
    // TERM is ignored, so the run only ends once the grace period hands over to a kill.
    let invocation = script("trap '' TERM; while :; do echo tick; sleep 0.05; done");

    let outcome = timeout(
        SETTLE_LIMIT,
        fast_runner().run(
            &invocation,
            CancellationToken::new(),
            progress_fn(|_, control| {
                calls += 1;
                control.cancel();
                control.cancel();
                Ok(())
            }),
        ),
    )
    .await
    .expect("run settles after kill")
    .unwrap();

    assert!(outcome.cancelled);
    assert_eq!(outcome.code, None);
    assert!(calls >= 1);
}

#[tokio::test]
async fn test_external_token_cancels_run() {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let outcome = timeout(
        SETTLE_LIMIT,
        fast_runner().run(&script("echo started; exec sleep 30"), token, NoProgress),
    )
    .await
    .expect("run settles after cancel")
    .unwrap();

    assert!(outcome.cancelled);
    assert_eq!(outcome.code, None);
}

#[tokio::test]
async fn test_kill_mode_skips_grace_period() {
    let runner = ArchiveRunner::new(RunnerSettings {
        terminate: TerminateMode::Kill,
        kill_grace: Duration::from_secs(60),
        ..RunnerSettings::default()
    });
    let token = CancellationToken::new();
    token.cancel();

    let outcome = timeout(
        SETTLE_LIMIT,
        runner.run(&script("trap '' TERM; exec sleep 30"), token, NoProgress),
    )
    .await
    .expect("kill does not wait for the grace period")
    .unwrap();

    assert!(outcome.cancelled);
}

#[derive(Debug, PartialEq, Eq)]
struct StopError(&'static str);

impl std::fmt::Display for StopError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stopped: {}", self.0)
    }
}

impl std::error::Error for StopError {}

#[tokio::test]
async fn test_handler_error_fails_run_with_same_error() {
    let result = timeout(
        SETTLE_LIMIT,
        ArchiveRunner::default().run(
            &script("echo first; exec sleep 30"),
            CancellationToken::new(),
            progress_fn(|_, _| Err(StopError("user abort").into())),
        ),
    )
    .await
    .expect("handler failure kills the archiver");

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HandlerFault);
    let RunError::Handler(inner) = err else {
        panic!("expected handler error");
    };
    assert_eq!(inner.downcast_ref::<StopError>(), Some(&StopError("user abort")));
}

#[tokio::test]
async fn test_handler_error_kills_and_reaps_archiver() {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let temp = tempfile::TempDir::new().unwrap();
    let pid_file = temp.path().join("pid");
    let body = format!("echo $$ > '{}'; echo first; exec sleep 30", pid_file.display());

    let err = timeout(
        SETTLE_LIMIT,
        ArchiveRunner::default().run(
            &script(&body),
            CancellationToken::new(),
            progress_fn(|_, _| Err(StopError("user abort").into())),
        ),
    )
    .await
    .expect("handler failure kills the archiver")
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HandlerFault);

    let pid: i32 = std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert_eq!(kill(Pid::from_raw(pid), None), Err(Errno::ESRCH));
}

#[tokio::test]
async fn test_handler_error_message_is_preserved() {
    let err = invoke(
        "sh",
        ["-c", "echo go"],
        None,
        progress_fn(|_, _| Err(anyhow!("progress sink closed"))),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::HandlerFault);
    assert!(err.to_string().contains("progress sink closed"));
}

#[tokio::test]
async fn test_password_prompt_answered_through_control() {
    let body = "printf 'Enter password (will not be echoed):'; read pw; \
                if [ \"$pw\" = hunter2 ]; then echo 'Everything is Ok'; \
                else echo 'Error: Wrong password'; exit 2; fi";
    let mut seen = String::new();

    let outcome = timeout(
        SETTLE_LIMIT,
        ArchiveRunner::default().run(
            &script(body),
            CancellationToken::new(),
            progress_fn(|chunk, control| {
                seen.push_str(chunk);
                if chunk.contains("Enter password") {
                    control.write_line("hunter2");
                }
                Ok(())
            }),
        ),
    )
    .await
    .expect("prompt answered")
    .unwrap();

    assert_eq!(outcome.code, Some(0));
    assert!(outcome.errors.is_empty());
    assert!(seen.contains("Everything is Ok"));
}

#[tokio::test]
async fn test_event_stream_reports_and_settles() {
    let body = "printf 'Enter password:'; read pw; echo \"got $pw\"; \
                printf 'Error: CRC Failed\\n'; printf 'warn\\n' >&2; exit 2";
    let mut run = ArchiveRunner::default().start(&script(body)).unwrap();

    let mut progress = String::new();
    let mut detected = Vec::new();
    let mut done = None;
    while let Some(event) = timeout(SETTLE_LIMIT, run.next_event()).await.unwrap() {
        match event {
            RunEvent::Progress(text) => {
                if text.contains("Enter password") {
                    assert!(run.write_line("secret"));
                }
                progress.push_str(&text);
            }
            RunEvent::ErrorDetected { source, message } => detected.push((source, message)),
            RunEvent::Done(outcome) => done = Some(outcome),
        }
    }

    let outcome = run.wait().await.unwrap();
    assert_eq!(done.as_ref(), Some(&outcome));
    assert_eq!(outcome.code, Some(2));
    assert!(progress.contains("got secret"));
    assert!(detected.contains(&(StreamSource::Stdout, "CRC Failed".to_string())));
    assert!(detected.contains(&(StreamSource::Stderr, "warn\n".to_string())));
    assert_eq!(outcome.errors.len(), detected.len());
}

#[tokio::test]
async fn test_run_handle_cancel() {
    let run = fast_runner().start(&script("exec sleep 30")).unwrap();
    run.cancel();
    run.cancel();

    let outcome = timeout(SETTLE_LIMIT, run.wait()).await.unwrap().unwrap();
    assert!(outcome.cancelled);
}

#[tokio::test]
async fn test_large_input_is_echoed_without_stalling() {
    const SIZE: usize = 1 << 20;
    let mut run = ArchiveRunner::default()
        .start(&Invocation::new("cat", Vec::<String>::new()))
        .unwrap();
    assert!(run.write_input(vec![b'a'; SIZE]));
    assert!(run.close_input());

    let mut echoed = 0;
    while let Some(event) = timeout(SETTLE_LIMIT, run.next_event())
        .await
        .expect("cat keeps echoing while its input is written")
    {
        if let RunEvent::Progress(text) = event {
            echoed += text.len();
        }
    }

    let outcome = run.wait().await.unwrap();
    assert_eq!(outcome.code, Some(0));
    assert_eq!(echoed, SIZE);
}

#[tokio::test]
async fn test_cancel_while_input_is_pending() {
    // Stdin stays open, so cat only stops once it is signalled.
    let run = fast_runner()
        .start(&Invocation::new("cat", Vec::<String>::new()))
        .unwrap();
    assert!(run.write_input(vec![b'a'; 1 << 20]));
    tokio::time::sleep(Duration::from_millis(500)).await;
    run.cancel();

    let outcome = timeout(SETTLE_LIMIT, run.wait())
        .await
        .expect("cancel is not blocked by a pending write")
        .unwrap();
    assert!(outcome.cancelled);
}

#[tokio::test]
async fn test_concurrent_runs_are_isolated() {
    let runner = ArchiveRunner::default();
    let first = script("printf 'Error: first\\n'; exit 1");
    let second = script("printf 'all good\\n'");
    let third = script("printf 'third\\n' >&2; exit 3");

    let (a, b, c) = tokio::join!(
        runner.run(&first, CancellationToken::new(), NoProgress),
        runner.run(&second, CancellationToken::new(), NoProgress),
        runner.run(&third, CancellationToken::new(), NoProgress),
    );
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

    assert_eq!((a.code, a.errors), (Some(1), vec!["first".to_string()]));
    assert_eq!((b.code, b.errors), (Some(0), Vec::<String>::new()));
    assert_eq!((c.code, c.errors), (Some(3), vec!["third\n".to_string()]));
}

#[tokio::test]
async fn test_cancelling_one_run_leaves_another_alone() {
    let runner = fast_runner();
    let token = CancellationToken::new();
    token.cancel();

    let slow_args = script("exec sleep 30");
    let quick_args = script("sleep 0.2; echo done");
    let (cancelled, untouched) = tokio::join!(
        runner.run(&slow_args, token, NoProgress),
        runner.run(&quick_args, CancellationToken::new(), NoProgress),
    );

    assert!(cancelled.unwrap().cancelled);
    let untouched = untouched.unwrap();
    assert!(!untouched.cancelled);
    assert_eq!(untouched.code, Some(0));
}

#[tokio::test]
async fn test_missing_binary_is_spawn_fault() {
    let err = invoke("archrun-no-such-archiver", ["l", "a.7z"], None, NoProgress)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SpawnFault);
}

#[tokio::test]
async fn test_invalid_invocations_fail_before_spawn() {
    let err = invoke("", ["l"], None, NoProgress).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = invoke("sh", ["-c", "a\0b"], None, NoProgress).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let bad = Switches::new().set("o", "");
    let err = invoke("sh", ["-c", "true"], Some(bad), NoProgress)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOption);
}
