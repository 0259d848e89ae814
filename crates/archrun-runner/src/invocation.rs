use archrun_switches::{Switches, serialize};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::command_spec::CommandSpec;
use crate::error::RunError;

/// One request to run the archiver: program, positional arguments and switches.
///
/// The runner only borrows an `Invocation`, so the same request can be run again.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// Program to spawn (an archiver binary name or path)
    pub command: String,
    /// Positional arguments, placed before the serialized switches
    pub args: Vec<String>,
    /// Switches serialized and appended after `args`
    pub switches: Option<Switches>,
    pub cwd: Option<PathBuf>,
    pub env: Option<HashMap<OsString, OsString>>,
}

impl Invocation {
    #[must_use]
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn switches(mut self, switches: Switches) -> Self {
        self.switches = Some(switches);
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Build the process specification: `args` followed by the serialized switches.
    ///
    /// Nothing is spawned here, so every error is reported before a process exists.
    ///
    /// # Errors
    ///
    /// - [`RunError::InvalidArgument`] for an empty command or NUL bytes
    /// - [`RunError::InvalidOption`] for switches that fail to serialize
    pub fn command_spec(&self) -> Result<CommandSpec, RunError> {
        let mut spec = CommandSpec::new(self.command.as_str()).args(self.args.iter().cloned());
        spec.validate()?;

        spec = spec.args(serialize(self.switches.as_ref())?);
        if let Some(ref cwd) = self.cwd {
            spec = spec.cwd(cwd.clone());
        }
        spec.env.clone_from(&self.env);

        Ok(spec)
    }
}
