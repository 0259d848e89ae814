use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use archrun_switches::Switches;

use super::{
    CONFIG_DIR, CONFIG_ENV_VAR, CONFIG_FILE, CliOverrides, Config, ConfigSource, RunnerConfig,
};
use crate::error::ConfigError;

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    runner: Option<RunnerConfig>,
    switches: Option<Switches>,
}

const RUNNER_KEYS: [&str; 4] = ["program", "read_buffer_bytes", "terminate", "kill_grace_ms"];

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// The file is the explicit `--config` path, else `$ARCHRUN_CONFIG`, else the
    /// nearest `.archrun/config.toml` above the current directory.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed, or a value is out of range.
    pub fn discover(cli: &CliOverrides) -> Result<Self, ConfigError> {
        let start_dir = env::current_dir().map_err(ConfigError::CurrentDir)?;
        let env_path = env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        Self::discover_from(&start_dir, env_path, cli)
    }

    /// Path-driven variant of [`Config::discover`] that reads no process-global state.
    ///
    /// # Errors
    ///
    /// See [`Config::discover`].
    pub fn discover_from(
        start_dir: &Path,
        env_path: Option<PathBuf>,
        cli: &CliOverrides,
    ) -> Result<Self, ConfigError> {
        let config_path = cli
            .config_path
            .clone()
            .or(env_path)
            .or_else(|| Self::find_config_file(start_dir));

        let mut config = match config_path {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Search `start_dir` and its ancestors for `.archrun/config.toml`.
    #[must_use]
    pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
        start_dir
            .ancestors()
            .map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load a config file without applying CLI overrides.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");

        let mut config = Self::parse(&content, path)?;
        config.config_file = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse config TOML held in memory.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`].
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, Path::new("<inline>"))
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let toml_config: TomlConfig =
            toml::from_str(content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::default();
        if let Some(runner) = toml_config.runner {
            let present = [
                runner.program.is_some(),
                runner.read_buffer_bytes.is_some(),
                runner.terminate.is_some(),
                runner.kill_grace_ms.is_some(),
            ];
            for (key, set) in RUNNER_KEYS.iter().zip(present) {
                if set {
                    config.attribute(key, ConfigSource::File);
                }
            }
            config.runner = runner;
        }
        if let Some(switches) = toml_config.switches {
            config.attribute("switches", ConfigSource::File);
            config.switches = switches;
        }
        Ok(config)
    }

    /// Layer command-line values over the current ones.
    pub fn apply_cli(&mut self, cli: &CliOverrides) {
        if let Some(ref program) = cli.program {
            self.runner.program = Some(program.clone());
            self.attribute("program", ConfigSource::Cli);
        }
        if let Some(terminate) = cli.terminate {
            self.runner.terminate = Some(terminate);
            self.attribute("terminate", ConfigSource::Cli);
        }
        if let Some(grace) = cli.kill_grace_ms {
            self.runner.kill_grace_ms = Some(grace);
            self.attribute("kill_grace_ms", ConfigSource::Cli);
        }
    }
}
