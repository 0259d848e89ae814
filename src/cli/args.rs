//! CLI argument definitions

use archrun_runner::TerminateMode;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// archrun - run 7-Zip style archivers with streamed progress and error detection
#[derive(Parser, Debug)]
#[command(name = "archrun")]
#[command(about = "Run a 7-Zip style archiver, streaming progress and collecting its errors")]
#[command(long_about = r#"
archrun spawns an archiver (7z by default), streams its output as it runs,
collects every "Error:" message and stderr chunk, and exits with the
archiver's own exit code.

EXAMPLES:
  # Extract an archive into out/, answering yes to all queries
  archrun run -s o=out -s y -- x backup.7z

  # Answer the password prompt from an environment variable
  ARCHIVE_PW=secret archrun run --password-env ARCHIVE_PW -- x locked.7z

  # Give up after 30 seconds and print the outcome as JSON
  archrun run --timeout 30 --json -- t huge.7z

  # Show the tokens a set of switches serializes to
  archrun switches -s p=secret -s ssc- -s i=*.txt -s i=*.md

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is discovered by searching upward from CWD for .archrun/config.toml
  Use --config or ARCHRUN_CONFIG to name an explicit config file
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the archiver with the given arguments
    Run {
        /// Archiver binary (overrides config)
        #[arg(long)]
        program: Option<String>,

        #[command(flatten)]
        switches: SwitchArgs,

        /// Working directory for the archiver
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Cancel the run after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Environment variable holding the answer to password prompts
        #[arg(long, value_name = "VAR")]
        password_env: Option<String>,

        /// How a cancelled archiver is stopped (overrides config)
        #[arg(long, value_enum)]
        terminate: Option<TerminateArg>,

        /// Print the outcome as JSON instead of streaming output
        #[arg(long)]
        json: bool,

        /// Archiver command and arguments, e.g. `x backup.7z`
        #[arg(last = true, required = true)]
        args: Vec<String>,
    },

    /// Print the tokens the given switches serialize to (passwords masked)
    Switches {
        #[command(flatten)]
        switches: SwitchArgs,
    },

    /// Print the effective configuration with value sources
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Switch flags shared by `run` and `switches`
#[derive(Args, Debug, Default, Clone)]
pub struct SwitchArgs {
    /// Archiver switch without its dash: `KEY` (flag), `KEY-` (negated flag)
    /// or `KEY=VALUE`. Repeatable switches (i, x, m, ai, ax) may be given more than once.
    #[arg(short = 's', long = "switch", value_name = "KEY[=VALUE]")]
    pub switch: Vec<String>,

    /// Token appended verbatim after all other switches
    #[arg(long, value_name = "TOKEN", allow_hyphen_values = true)]
    pub raw: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateArg {
    Term,
    Kill,
}

impl From<TerminateArg> for TerminateMode {
    fn from(arg: TerminateArg) -> Self {
        match arg {
            TerminateArg::Term => Self::Term,
            TerminateArg::Kill => Self::Kill,
        }
    }
}
