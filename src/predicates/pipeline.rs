use async_trait::async_trait;

use crate::error::ConvergenceError;
use crate::exec::{CommandOutput, DynExecutor, ExecError, Invocation};
use crate::poll::{PollOutcome, Predicate};

use super::OC;

const NO_RESOURCES: &str = "No resources found";
const LATEST_CONDITION: &str = "jsonpath={.items[-1].status.conditions[0].status}";

/// Which pipeline runs to look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRunSelector {
    pub namespace: String,
    pub field_selector: Option<String>,
}

impl PipelineRunSelector {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            field_selector: None,
        }
    }

    pub fn with_field_selector(mut self, selector: impl Into<String>) -> Self {
        self.field_selector = Some(selector.into());
        self
    }

    fn list(&self) -> Invocation {
        let mut invocation = Invocation::new(
            OC,
            ["get", "pipelinerun", "-n", self.namespace.as_str()],
        );
        if let Some(selector) = &self.field_selector {
            invocation = invocation.arg("--field-selector").arg(selector);
        }
        invocation
    }
}

/// First phase: at least one pipeline run exists.
pub struct PipelineRunPresence {
    executor: DynExecutor,
    selector: PipelineRunSelector,
}

impl PipelineRunPresence {
    pub fn new(executor: DynExecutor, selector: PipelineRunSelector) -> Self {
        Self { executor, selector }
    }

    pub fn invocation(&self) -> Invocation {
        self.selector.list()
    }
}

#[async_trait]
impl Predicate for PipelineRunPresence {
    fn describe(&self) -> String {
        format!("pipeline runs in {}", self.selector.namespace)
    }

    async fn evaluate(&self) -> PollOutcome {
        presence_outcome(self.invocation().run(self.executor.as_ref()).await)
    }
}

pub fn presence_outcome(result: Result<CommandOutput, ExecError>) -> PollOutcome {
    match observe_presence(result) {
        Ok(()) => PollOutcome::Ready,
        Err(error) => error.into(),
    }
}

fn observe_presence(result: Result<CommandOutput, ExecError>) -> Result<(), ConvergenceError> {
    let output = result.map_err(|e| ConvergenceError::adapter(e.to_string()))?;

    // `oc get` prints this to stderr, with exit status 0, for an empty list.
    if output.stderr.contains(NO_RESOURCES) {
        return Err(ConvergenceError::transient(output.stderr.trim().to_string()));
    }
    if !output.is_success() {
        return Err(ConvergenceError::adapter(output.failure_summary()));
    }
    if output.stdout.trim().is_empty() {
        return Err(ConvergenceError::transient("no pipeline runs listed yet"));
    }
    Ok(())
}

/// Second phase: the most recently started run has finished successfully.
pub struct PipelineRunCompletion {
    executor: DynExecutor,
    selector: PipelineRunSelector,
}

impl PipelineRunCompletion {
    pub fn new(executor: DynExecutor, selector: PipelineRunSelector) -> Self {
        Self { executor, selector }
    }

    pub fn invocation(&self) -> Invocation {
        self.selector
            .list()
            .arg("--sort-by=.status.startTime")
            .arg("-o")
            .arg(LATEST_CONDITION)
    }
}

#[async_trait]
impl Predicate for PipelineRunCompletion {
    fn describe(&self) -> String {
        format!("latest pipeline run in {}", self.selector.namespace)
    }

    async fn evaluate(&self) -> PollOutcome {
        completion_outcome(self.invocation().run(self.executor.as_ref()).await)
    }
}

pub fn completion_outcome(result: Result<CommandOutput, ExecError>) -> PollOutcome {
    let output = match result {
        Ok(output) => output,
        Err(e) => return ConvergenceError::adapter(e.to_string()).into(),
    };

    if output.stderr.contains(NO_RESOURCES) {
        return PollOutcome::NotYetReady;
    }
    if !output.is_success() {
        return ConvergenceError::adapter(output.failure_summary()).into();
    }

    condition_outcome(&output.stdout)
}

/// Interpret a Tekton `Succeeded` condition status as printed by jsonpath.
pub fn condition_outcome(raw: &str) -> PollOutcome {
    let status = raw.trim().trim_matches('\'');
    match status {
        "True" => PollOutcome::Ready,
        // Empty means the run exists but has not reported a condition yet.
        "Unknown" | "" => PollOutcome::NotYetReady,
        other => ConvergenceError::definitive(format!(
            "pipeline run condition is {other}; one or more checks failed"
        ))
        .into(),
    }
}
