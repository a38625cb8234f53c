use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::process::Command as TokioCommand;
use tracing::{debug, trace};

use super::{CommandExecutor, CommandOutput, ExecError};

/// Runs real processes, resolving each program on `PATH` once.
#[derive(Debug, Default)]
pub struct ProcessExecutor {
    cache: Mutex<HashMap<String, PathBuf>>,
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a program name to an absolute path, caching the lookup.
    pub fn resolve(&self, program: &str) -> Result<PathBuf, ExecError> {
        if let Ok(cache) = self.cache.lock() {
            if let Some(path) = cache.get(program) {
                return Ok(path.clone());
            }
        }

        let path = which::which(program).map_err(|_| ExecError::NotFound {
            program: program.to_string(),
        })?;

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(program.to_string(), path.clone());
        }
        Ok(path)
    }
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ExecError> {
        let path = self.resolve(program)?;
        debug!(program, args = ?redacted(args), "running command");

        // An abandoned evaluation must not leak the child.
        let output = TokioCommand::new(&path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExecError::NotFound {
                        program: program.to_string(),
                    }
                } else {
                    ExecError::Spawn {
                        program: program.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        };
        trace!(
            program,
            exit_code = ?result.exit_code,
            stdout = %result.stdout.trim(),
            stderr = %result.stderr.trim(),
            "command finished"
        );
        Ok(result)
    }
}

const SECRET_FLAGS: [&str; 2] = ["--password", "--git-host-access-token"];
const SECRET_CONFIG_PREFIX: &str = "http.extraHeader=";

/// Argument vector safe to log: values of secret-bearing flags are masked.
pub(super) fn redacted(args: &[String]) -> Vec<String> {
    let mut masked = Vec::with_capacity(args.len());
    let mut hide_next = false;
    for arg in args {
        if hide_next {
            masked.push("<redacted>".to_string());
            hide_next = false;
        } else if arg.starts_with(SECRET_CONFIG_PREFIX) {
            masked.push(format!("{SECRET_CONFIG_PREFIX}<redacted>"));
        } else {
            hide_next = SECRET_FLAGS.contains(&arg.as_str());
            masked.push(arg.clone());
        }
    }
    masked
}
