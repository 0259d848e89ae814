//! Subcommand implementations

use anyhow::{Context, Result};
use archrun_config::Config;
use archrun_runner::{
    ArchiveRunner, CancellationToken, Control, Invocation, Outcome, ProgressHandler, RunError,
    StreamSource,
};
use archrun_switches::switches::REPEATABLE;
use archrun_switches::{SwitchError, SwitchValue, Switches, redact};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use super::args::SwitchArgs;
use crate::exit_codes::ExitCode;

/// Prompt text the archiver prints before reading a password from stdin.
///
/// Matched within a single stdout chunk. A prompt split across two reads is
/// not seen, and the archiver then waits on stdin until a timeout cancels it.
const PASSWORD_PROMPT: &str = "enter password";

/// Options for `archrun run` after config has been applied
#[derive(Debug)]
pub(crate) struct RunOptions {
    pub switches: SwitchArgs,
    pub cwd: Option<PathBuf>,
    pub timeout: Option<u64>,
    pub password_env: Option<String>,
    pub json: bool,
    pub args: Vec<String>,
}

/// Build [`Switches`] from `-s KEY[=VALUE]` and `--raw TOKEN` arguments.
///
/// `KEY` is a flag, `KEY-` a negated flag and `KEY=VALUE` a text value.
/// Repeating a key listed in [`REPEATABLE`] collects its values into a list;
/// repeating any other key keeps the last value.
///
/// # Errors
///
/// Fails on an empty key. Everything else is checked when the switches are
/// serialized.
pub fn parse_switches(args: &SwitchArgs) -> Result<Switches> {
    let mut switches = Switches::new();

    for spec in &args.switch {
        let (key, value) = match spec.split_once('=') {
            Some((key, value)) => (key, SwitchValue::Text(value.to_string())),
            None => match spec.strip_suffix('-') {
                Some(key) => (key, SwitchValue::Flag(false)),
                None => (spec.as_str(), SwitchValue::Flag(true)),
            },
        };
        if key.is_empty() {
            return Err(SwitchError::InvalidKey {
                key: spec.clone(),
                reason: "missing name",
            }
            .into());
        }

        let merged = match (switches.remove(key), value) {
            (Some(SwitchValue::Text(first)), SwitchValue::Text(next))
                if REPEATABLE.contains(&key) =>
            {
                SwitchValue::List(vec![first, next])
            }
            (Some(SwitchValue::List(mut items)), SwitchValue::Text(next))
                if REPEATABLE.contains(&key) =>
            {
                items.push(next);
                SwitchValue::List(items)
            }
            (_, value) => value,
        };
        switches.insert(key, merged);
    }

    if !args.raw.is_empty() {
        switches = switches.raw(args.raw.iter().cloned());
    }
    Ok(switches)
}

/// Streams progress to stdout and detected errors to stderr, answering
/// password prompts when a password is available.
struct CliHandler {
    password: Option<String>,
    stream: bool,
}

impl ProgressHandler for CliHandler {
    fn on_progress(&mut self, chunk: &str, control: &mut Control) -> anyhow::Result<()> {
        if self.stream {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(chunk.as_bytes())?;
            stdout.flush()?;
        }

        if chunk.to_ascii_lowercase().contains(PASSWORD_PROMPT) {
            match self.password {
                Some(ref password) => {
                    debug!("Answering password prompt");
                    control.write_line(password);
                }
                None => {
                    // Nothing to answer with; closing stdin makes the archiver fail fast.
                    debug!("Password prompt without --password-env; closing stdin");
                    control.close_input();
                }
            }
        }
        Ok(())
    }

    fn on_error(&mut self, source: StreamSource, message: &str) {
        if self.stream {
            match source {
                StreamSource::Stdout => eprintln!("✗ {message}"),
                StreamSource::Stderr => eprint!("{message}"),
            }
        }
    }
}

pub(crate) async fn execute_run(config: &Config, opts: RunOptions) -> Result<ExitCode> {
    let password = match opts.password_env {
        Some(ref var) => Some(
            std::env::var(var)
                .with_context(|| format!("--password-env: environment variable {var} is not set"))?,
        ),
        None => None,
    };

    let own = parse_switches(&opts.switches)?;
    let switches = own.merged_over(&config.switches);

    if opts.args.is_empty() {
        return Err(RunError::InvalidArgument {
            reason: "missing archiver command after --".to_string(),
        }
        .into());
    }
    let mut invocation = Invocation::new(config.program(), opts.args);
    if !switches.is_empty() {
        invocation = invocation.switches(switches);
    }
    if let Some(cwd) = opts.cwd {
        invocation = invocation.cwd(cwd);
    }

    let cancel = CancellationToken::new();
    let timer = opts.timeout.map(|secs| {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            info!(timeout_secs = secs, "Timeout expired; cancelling archiver");
            token.cancel();
        })
    });

    let handler = CliHandler {
        password,
        stream: !opts.json,
    };
    let runner = ArchiveRunner::new(config.runner_settings());
    let result = runner.run(&invocation, cancel, handler).await;
    if let Some(timer) = timer {
        timer.abort();
    }

    let outcome = result.context("archiver run failed")?;
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        report_summary(&outcome);
    }
    Ok(ExitCode::from_outcome(&outcome))
}

fn report_summary(outcome: &Outcome) {
    if outcome.cancelled {
        eprintln!("✗ Archiver cancelled after timeout");
    } else if outcome.code.is_none() {
        eprintln!("✗ Archiver terminated by a signal");
    }
}

pub(crate) fn execute_switches(config: &Config, args: &SwitchArgs) -> Result<ExitCode> {
    let switches = parse_switches(args)?.merged_over(&config.switches);
    let tokens = switches.to_args()?;
    for token in redact(&tokens) {
        println!("{token}");
    }
    Ok(ExitCode::SUCCESS)
}

pub(crate) fn execute_config(config: &Config, json: bool) -> Result<ExitCode> {
    let effective = config.effective_config();

    if json {
        let map: serde_json::Map<String, serde_json::Value> = effective
            .into_iter()
            .map(|(key, (value, source))| {
                (key, serde_json::json!({ "value": value, "source": source }))
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(ExitCode::SUCCESS);
    }

    match config.config_file {
        Some(ref path) => println!("# config file: {}", path.display()),
        None => println!("# config file: (none)"),
    }
    for (key, (value, source)) in effective {
        println!("{key} = {value:?} ({source})");
    }
    Ok(ExitCode::SUCCESS)
}
