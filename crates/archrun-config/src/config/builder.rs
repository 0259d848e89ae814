use archrun_runner::TerminateMode;
use archrun_switches::{SwitchValue, Switches};
use std::path::{Path, PathBuf};

use super::{Config, ConfigSource};
use crate::error::ConfigError;

/// Builder for [`Config`] that never reads the environment or the filesystem
/// unless [`ConfigBuilder::file`] is called.
///
/// # Example
///
/// ```rust
/// use archrun_config::Config;
///
/// let config = Config::builder()
///     .program("7za")
///     .kill_grace_ms(500)
///     .switch("y", true)
///     .build()
///     .expect("valid config");
///
/// assert_eq!(config.program(), "7za");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    file: Option<PathBuf>,
    program: Option<String>,
    read_buffer_bytes: Option<usize>,
    terminate: Option<TerminateMode>,
    kill_grace_ms: Option<u64>,
    switches: Switches,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a config file; builder values are layered over it.
    #[must_use]
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    #[must_use]
    pub const fn read_buffer_bytes(mut self, bytes: usize) -> Self {
        self.read_buffer_bytes = Some(bytes);
        self
    }

    #[must_use]
    pub const fn terminate(mut self, mode: TerminateMode) -> Self {
        self.terminate = Some(mode);
        self
    }

    #[must_use]
    pub const fn kill_grace_ms(mut self, millis: u64) -> Self {
        self.kill_grace_ms = Some(millis);
        self
    }

    /// Add a default switch.
    #[must_use]
    pub fn switch(mut self, key: impl Into<String>, value: impl Into<SwitchValue>) -> Self {
        self.switches.insert(key, value);
        self
    }

    /// Build and validate.
    ///
    /// # Errors
    ///
    /// File errors from [`Config::load`], or [`ConfigError::InvalidValue`].
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut config = match self.file {
            Some(ref path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(program) = self.program {
            config.runner.program = Some(program);
            config.attribute("program", ConfigSource::Programmatic);
        }
        if let Some(bytes) = self.read_buffer_bytes {
            config.runner.read_buffer_bytes = Some(bytes);
            config.attribute("read_buffer_bytes", ConfigSource::Programmatic);
        }
        if let Some(mode) = self.terminate {
            config.runner.terminate = Some(mode);
            config.attribute("terminate", ConfigSource::Programmatic);
        }
        if let Some(millis) = self.kill_grace_ms {
            config.runner.kill_grace_ms = Some(millis);
            config.attribute("kill_grace_ms", ConfigSource::Programmatic);
        }
        if !self.switches.is_empty() {
            config.switches = self.switches.merged_over(&config.switches);
            config.attribute("switches", ConfigSource::Programmatic);
        }

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_builder_defaults() {
        let config = Config::builder().build().unwrap();
        let settings = config.runner_settings();

        assert_eq!(config.program(), "7z");
        assert_eq!(settings.read_buffer_bytes, 8192);
        assert_eq!(settings.terminate, TerminateMode::Term);
        assert_eq!(settings.kill_grace, Duration::from_secs(5));
    }

    #[test]
    fn test_builder_values_are_programmatic() {
        let config = Config::builder()
            .program("7zz")
            .read_buffer_bytes(4096)
            .terminate(TerminateMode::Kill)
            .switch("y", true)
            .build()
            .unwrap();

        assert_eq!(config.program(), "7zz");
        assert_eq!(config.runner_settings().read_buffer_bytes, 4096);
        assert_eq!(config.source_of("program"), ConfigSource::Programmatic);
        assert_eq!(config.source_of("switches"), ConfigSource::Programmatic);
        assert_eq!(config.source_of("kill_grace_ms"), ConfigSource::Default);
    }

    #[test]
    fn test_builder_layers_over_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "[runner]\nprogram = \"7za\"\nkill_grace_ms = 100\n\n[switches]\ny = true\nmmt = \"4\"\n",
        )
        .unwrap();

        let config = Config::builder()
            .file(&path)
            .kill_grace_ms(900)
            .switch("mmt", "2")
            .build()
            .unwrap();

        assert_eq!(config.program(), "7za");
        assert_eq!(config.source_of("program"), ConfigSource::File);
        assert_eq!(config.runner_settings().kill_grace, Duration::from_millis(900));
        assert_eq!(config.switches.to_args().unwrap(), vec!["-mmt2", "-y"]);
    }

    #[test]
    fn test_builder_validates() {
        let err = Config::builder().program("  ").build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "program"));
    }
}
