//! CLI entry point and dispatch
//!
//! `run()` parses arguments, discovers configuration, builds the tokio runtime,
//! dispatches to a command and prints any failure. main.rs only maps the
//! returned code to the process exit status.

use anyhow::Context;
use archrun_config::{CliOverrides, Config};
use clap::Parser;

use super::args::{Cli, Commands};
use super::commands::{self, RunOptions};
use crate::exit_codes::ExitCode;
use crate::logging::init_tracing;

/// Main CLI execution function.
///
/// Returns `Err` with the exit code whenever the process should not exit 0,
/// including a passed-through non-zero archiver code.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("✗ Failed to initialize logging: {e}");
    }

    let overrides = match cli.command {
        Commands::Run {
            ref program,
            terminate,
            ..
        } => CliOverrides {
            config_path: cli.config.clone(),
            program: program.clone(),
            terminate: terminate.map(Into::into),
            kill_grace_ms: None,
        },
        _ => CliOverrides {
            config_path: cli.config.clone(),
            ..CliOverrides::default()
        },
    };

    let config = match Config::discover(&overrides).context("Failed to load configuration") {
        Ok(config) => config,
        Err(err) => return Err(report(&err)),
    };

    let result = match cli.command {
        Commands::Run {
            switches,
            cwd,
            timeout,
            password_env,
            json,
            args,
            ..
        } => {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("✗ Failed to create async runtime: {e}");
                    return Err(ExitCode::FAULT);
                }
            };
            let opts = RunOptions {
                switches,
                cwd,
                timeout,
                password_env,
                json,
                args,
            };
            rt.block_on(commands::execute_run(&config, opts))
        }
        Commands::Switches { switches } => commands::execute_switches(&config, &switches),
        Commands::Config { json } => commands::execute_config(&config, json),
    };

    match result {
        Ok(code) if code == ExitCode::SUCCESS => Ok(()),
        Ok(code) => Err(code),
        Err(err) => Err(report(&err)),
    }
}

fn report(err: &anyhow::Error) -> ExitCode {
    eprintln!("✗ {err:#}");
    ExitCode::from_error(err)
}
