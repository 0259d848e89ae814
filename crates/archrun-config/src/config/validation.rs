use super::Config;
use crate::error::ConfigError;

pub(crate) const MIN_READ_BUFFER_BYTES: usize = 512;
pub(crate) const MAX_READ_BUFFER_BYTES: usize = 1024 * 1024;
pub(crate) const MAX_KILL_GRACE_MS: u64 = 60_000;

impl Config {
    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref program) = self.runner.program {
            if program.trim().is_empty() {
                return Err(ConfigError::invalid("program", "must not be empty"));
            }
            if program.contains('\0') {
                return Err(ConfigError::invalid("program", "must not contain NUL bytes"));
            }
        }

        if let Some(bytes) = self.runner.read_buffer_bytes {
            if bytes < MIN_READ_BUFFER_BYTES {
                return Err(ConfigError::invalid(
                    "read_buffer_bytes",
                    format!("must be at least {MIN_READ_BUFFER_BYTES} bytes"),
                ));
            }
            if bytes > MAX_READ_BUFFER_BYTES {
                return Err(ConfigError::invalid(
                    "read_buffer_bytes",
                    "exceeds maximum limit of 1 MiB",
                ));
            }
        }

        if let Some(grace) = self.runner.kill_grace_ms
            && grace > MAX_KILL_GRACE_MS
        {
            return Err(ConfigError::invalid(
                "kill_grace_ms",
                format!("exceeds maximum limit of {MAX_KILL_GRACE_MS} ms"),
            ));
        }

        // Default switches must serialize on their own, not only once merged.
        self.switches
            .to_args()
            .map_err(|e| ConfigError::invalid("switches", e.to_string()))?;

        Ok(())
    }
}
