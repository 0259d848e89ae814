//! Configuration model with discovery and precedence: CLI > file > defaults.
//!
//! The TOML file has a `[runner]` section for process settings and a
//! `[switches]` table of default archiver switches.

mod builder;
mod discovery;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use model::*;

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "ARCHRUN_CONFIG";

/// Directory searched for upward from the working directory
pub const CONFIG_DIR: &str = ".archrun";

pub const CONFIG_FILE: &str = "config.toml";
