//! Configuration for archrun
//!
//! Configuration is layered with precedence: CLI flags > config file > defaults.
//! The config file is `.archrun/config.toml`, found by searching upward from the
//! working directory, or named explicitly (flag or `ARCHRUN_CONFIG`).

mod config;
pub mod error;

pub use config::{
    CONFIG_DIR, CONFIG_ENV_VAR, CONFIG_FILE, CliOverrides, Config, ConfigBuilder, ConfigSource,
    DEFAULT_PROGRAM, RunnerConfig,
};
pub use error::ConfigError;
