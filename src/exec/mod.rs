//! Executor adapter: the only place the harness talks to external binaries.
//!
//! Predicates and bootstrap code depend on [`CommandExecutor`] rather than on
//! `tokio::process` directly, so a scripted executor can stand in for `oc`,
//! `argocd` and `git` in tests.

mod process;
#[cfg(test)]
pub mod scripted;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use process::ProcessExecutor;

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(code),
        }
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Short description of a failed run for error messages.
    pub fn failure_summary(&self) -> String {
        let detail = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        match self.exit_code {
            Some(code) => format!("exit code {code}: {detail}"),
            None => format!("terminated by signal: {detail}"),
        }
    }
}

/// Failures where no [`CommandOutput`] could be produced at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("Command not found: {program}. Please ensure the command exists in your PATH.")]
    NotFound { program: String },

    #[error("Failed to execute command '{program}': {reason}")]
    Spawn { program: String, reason: String },
}

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ExecError>;
}

pub type DynExecutor = Arc<dyn CommandExecutor>;

/// A program plus its argument vector, kept together for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub async fn run(&self, executor: &dyn CommandExecutor) -> Result<CommandOutput, ExecError> {
        executor.run(&self.program, &self.args).await
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
