use async_trait::async_trait;

use crate::error::ConvergenceError;
use crate::exec::{CommandOutput, DynExecutor, ExecError, Invocation};
use crate::poll::{PollOutcome, Predicate};

use super::OC;

const ROLLED_OUT: &str = "successfully rolled out";

/// Waits for `oc rollout status` to report a finished rollout.
pub struct DeploymentRollout {
    executor: DynExecutor,
    namespace: String,
    name: String,
}

impl DeploymentRollout {
    pub fn new(executor: DynExecutor, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            executor,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn invocation(&self) -> Invocation {
        // --watch=false keeps each evaluation short; the poller owns the cadence.
        Invocation::new(
            OC,
            [
                "rollout",
                "status",
                "deployment",
                self.name.as_str(),
                "-n",
                self.namespace.as_str(),
                "--watch=false",
            ],
        )
    }
}

#[async_trait]
impl Predicate for DeploymentRollout {
    fn describe(&self) -> String {
        format!("deployment {}/{}", self.namespace, self.name)
    }

    async fn evaluate(&self) -> PollOutcome {
        rollout_outcome(self.invocation().run(self.executor.as_ref()).await)
    }
}

pub fn rollout_outcome(result: Result<CommandOutput, ExecError>) -> PollOutcome {
    match observe_rollout(result) {
        Ok(true) => PollOutcome::Ready,
        Ok(false) => PollOutcome::NotYetReady,
        Err(error) => error.into(),
    }
}

fn observe_rollout(result: Result<CommandOutput, ExecError>) -> Result<bool, ConvergenceError> {
    let output = result.map_err(|e| ConvergenceError::adapter(e.to_string()))?;

    if output.is_success() {
        return Ok(output.stdout.contains(ROLLED_OUT));
    }

    let stderr = output.stderr.to_lowercase();
    if stderr.contains("not found") || stderr.contains("waiting for") {
        // Deployment not created yet, or the controller has not observed it.
        return Err(ConvergenceError::transient(output.failure_summary()));
    }

    Err(ConvergenceError::adapter(output.failure_summary()))
}
