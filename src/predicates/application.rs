use async_trait::async_trait;
use regex::Regex;

use crate::error::ConvergenceError;
use crate::exec::{CommandOutput, DynExecutor, ExecError, Invocation};
use crate::poll::{PollOutcome, Predicate};

use super::ARGOCD;

/// Waits for a CD application row in `argocd app list` to show a state.
pub struct ApplicationSync {
    executor: DynExecutor,
    name: String,
    desired_state: String,
    row: Regex,
}

impl ApplicationSync {
    pub fn new(
        executor: DynExecutor,
        name: impl Into<String>,
        desired_state: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let row = application_row(&name);
        Self {
            executor,
            name,
            desired_state: desired_state.into(),
            row,
        }
    }

    pub fn invocation(&self) -> Invocation {
        Invocation::new(ARGOCD, ["app", "list"])
    }

    pub fn outcome(&self, result: Result<CommandOutput, ExecError>) -> PollOutcome {
        match self.observe(result) {
            Ok(true) => PollOutcome::Ready,
            Ok(false) => PollOutcome::NotYetReady,
            Err(error) => error.into(),
        }
    }

    fn observe(&self, result: Result<CommandOutput, ExecError>) -> Result<bool, ConvergenceError> {
        let output = result.map_err(|e| ConvergenceError::adapter(e.to_string()))?;
        if !output.is_success() {
            return Err(ConvergenceError::adapter(output.failure_summary()));
        }

        match self.row.find(&output.stdout) {
            Some(row) => Ok(row.as_str().contains(&self.desired_state)),
            None => Err(ConvergenceError::transient(format!(
                "application {} not listed yet",
                self.name
            ))),
        }
    }
}

/// Matches the list row for `name`, with or without an `<namespace>/` prefix.
fn application_row(name: &str) -> Regex {
    let pattern = format!(r"(?m)^(?:\S+/)?{}\s.*$", regex::escape(name));
    Regex::new(&pattern).expect("escaped application name is a valid pattern")
}

#[async_trait]
impl Predicate for ApplicationSync {
    fn describe(&self) -> String {
        format!("application {} ({})", self.name, self.desired_state)
    }

    async fn evaluate(&self) -> PollOutcome {
        self.outcome(self.invocation().run(self.executor.as_ref()).await)
    }
}
