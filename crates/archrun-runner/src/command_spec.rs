use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command as TokioCommand;

use crate::error::RunError;

// ============================================================================
// CommandSpec - argv-style process specification
// ============================================================================

/// Specification for an archiver process.
///
/// The program and every argument are kept as discrete elements and handed to
/// the OS as an argument vector. Nothing is ever joined into a shell string.
///
/// # Example
///
/// ```rust
/// use archrun_runner::CommandSpec;
///
/// let cmd = CommandSpec::new("7z")
///     .arg("x")
///     .args(["backup.7z", "-o/restore"])
///     .cwd("/tmp");
///
/// assert_eq!(cmd.program, "7z");
/// assert_eq!(cmd.args.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    /// The program to execute
    pub program: String,
    /// Arguments as discrete elements (NOT shell strings)
    pub args: Vec<String>,
    /// Optional working directory
    pub cwd: Option<PathBuf>,
    /// Optional environment overrides
    pub env: Option<HashMap<OsString, OsString>>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
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

    /// Check the program and arguments can be passed to the OS unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::InvalidArgument`] when the program is empty or any
    /// element contains a NUL byte.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.program.is_empty() {
            return Err(RunError::invalid_argument("command must be a non-empty string"));
        }
        if self.program.contains('\0') {
            return Err(RunError::invalid_argument("command must not contain NUL bytes"));
        }
        if let Some(index) = self.args.iter().position(|arg| arg.contains('\0')) {
            return Err(RunError::invalid_argument(format!(
                "argument {index} must not contain NUL bytes"
            )));
        }
        Ok(())
    }

    /// Build a `tokio::process::Command` with all three standard streams piped.
    ///
    /// The child is killed if the returned `Child` is dropped before it exits.
    #[must_use]
    pub fn to_tokio_command(&self) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        if let Some(ref env) = self.env {
            cmd.envs(env);
        }

        cmd
    }
}
