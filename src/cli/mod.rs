//! Command-line interface for archrun
//!
//! - `args`: clap definitions
//! - `run`: entry point and dispatch
//! - `commands`: subcommand implementations

pub mod args;
mod commands;
mod run;

pub use args::{Cli, Commands, SwitchArgs};
pub use commands::parse_switches;
pub use run::run;
