use std::{fmt, path::PathBuf, time::Duration};

use tracing::trace;

use skiff_model::Env;

use super::LogConfig;
use crate::ExecError;

/// Command a [`super::SubprocessLauncher`] runs for every launch.
#[derive(Debug, Clone)]
pub struct SubprocessConfig {
    /// Command to execute (e.g. `"submit-run"`, `"/usr/bin/python"`).
    pub command: String,
    /// Command-line arguments passed to the command.
    pub args: Vec<String>,
    /// Extra environment; `SKIFF_RUN_ID` and `SKIFF_CLUSTER` are always added.
    pub env: Env,
    /// Working directory for the subprocess.
    ///
    /// If `None`, the subprocess inherits the parent process working directory.
    pub cwd: Option<PathBuf>,
    /// Kill the command and fail the launch after this long.
    pub timeout: Option<Duration>,
    pub log: LogConfig,
}

impl SubprocessConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: Env::new(),
            cwd: None,
            timeout: None,
            log: LogConfig::default(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Parse a whitespace separated command line (`"submit --queue default"`).
    ///
    /// Quotes and escapes are not interpreted: `--name "a b"` yields the tokens `--name`,
    /// `"a`, `b"`. Arguments containing whitespace must be passed through [`Self::with_args`].
    pub fn from_command_line(line: &str) -> Result<Self, ExecError> {
        let mut parts = line.split_whitespace();
        let command = parts
            .next()
            .ok_or_else(|| ExecError::InvalidConfig("launcher command is empty".into()))?;
        Ok(Self::new(command).with_args(parts))
    }

    /// Validate the configuration before spawning a subprocess.
    ///
    /// Rules:
    /// - `command` is not empty or whitespace-only.
    /// - `timeout`, when set, is not zero.
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.command.trim().is_empty() {
            return Err(ExecError::InvalidConfig("launcher command is empty".into()));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(ExecError::InvalidConfig("launcher timeout cannot be zero".into()));
        }
        Ok(())
    }

    /// Emit a trace-level log with the essential configuration fields.
    pub fn trace_state(&self) {
        trace!(
            command = %self.command,
            args = ?self.args,
            cwd = ?self.cwd,
            env_len = self.env.len(),
            timeout = ?self.timeout,
            "launcher command resolved"
        );
    }
}

impl fmt::Display for SubprocessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SubprocessConfig(cmd='{}', args={}, env={}, cwd={:?}, timeout={:?})",
            self.command,
            self.args.len(),
            self.env.len(),
            self.cwd,
            self.timeout,
        )
    }
}
