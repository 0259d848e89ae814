use archrun_runner::{RunnerSettings, TerminateMode};
use archrun_switches::Switches;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Archiver binary used when nothing else is configured
pub const DEFAULT_PROGRAM: &str = "7z";

/// Where a configuration value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Cli,
    File,
    Programmatic,
    Default,
}

impl ConfigSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::File => "config",
            Self::Programmatic => "programmatic",
            Self::Default => "default",
        }
    }
}

/// `[runner]` section of config.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Archiver binary name or path
    pub program: Option<String>,
    /// Size of a single stdout/stderr read
    pub read_buffer_bytes: Option<usize>,
    /// `term` (signal, then kill after the grace period) or `kill`
    pub terminate: Option<TerminateMode>,
    /// Milliseconds between the termination signal and a hard kill
    pub kill_grace_ms: Option<u64>,
}

/// Values given on the command line; `None` leaves the lower layers in place.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub program: Option<String>,
    pub terminate: Option<TerminateMode>,
    pub kill_grace_ms: Option<u64>,
}

/// Configuration for archrun.
///
/// Build one with [`Config::discover`] for CLI-like behavior, or with
/// [`Config::builder`] when embedding and the user's environment must not leak in.
#[derive(Debug, Clone)]
pub struct Config {
    pub runner: RunnerConfig,
    /// Default switches, merged under each invocation's own switches
    pub switches: Switches,
    /// Config file the values were read from, if any
    pub config_file: Option<PathBuf>,
    pub(crate) source_attribution: HashMap<String, ConfigSource>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runner: RunnerConfig::default(),
            switches: Switches::new(),
            config_file: None,
            source_attribution: HashMap::new(),
        }
    }
}

impl Config {
    /// Archiver binary to spawn.
    #[must_use]
    pub fn program(&self) -> &str {
        self.runner.program.as_deref().unwrap_or(DEFAULT_PROGRAM)
    }

    /// Drive-loop settings with defaults filled in.
    #[must_use]
    pub fn runner_settings(&self) -> RunnerSettings {
        let defaults = RunnerSettings::default();
        RunnerSettings {
            read_buffer_bytes: self
                .runner
                .read_buffer_bytes
                .unwrap_or(defaults.read_buffer_bytes),
            terminate: self.runner.terminate.unwrap_or(defaults.terminate),
            kill_grace: self
                .runner
                .kill_grace_ms
                .map_or(defaults.kill_grace, Duration::from_millis),
        }
    }

    /// Source of a configuration key; unknown keys report `Default`.
    #[must_use]
    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.source_attribution
            .get(key)
            .copied()
            .unwrap_or(ConfigSource::Default)
    }

    pub(crate) fn attribute(&mut self, key: &str, source: ConfigSource) {
        self.source_attribution.insert(key.to_string(), source);
    }
}
