//! Predicate evaluators for the external systems the workflow waits on.
//!
//! Every evaluator runs one command through the executor adapter and turns
//! the result into a [`PollOutcome`]. Transient conditions (resource not
//! created yet, rollout in progress) keep the poller going; adapter errors and
//! negative observations stop it.

mod application;
mod deployment;
mod pipeline;

use std::fmt;

use crate::error::Result;
use crate::exec::DynExecutor;
use crate::poll::{Convergence, ConvergenceReport, PollBudget, Predicate, converge};

use application::ApplicationSync;
use pipeline::{PipelineRunCompletion, PipelineRunPresence};

pub use deployment::DeploymentRollout;
pub use pipeline::PipelineRunSelector;

pub(crate) const OC: &str = "oc";
pub(crate) const ARGOCD: &str = "argocd";

/// An external entity whose convergence can be observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalTarget {
    Deployment {
        namespace: String,
        name: String,
    },
    GitOpsApplication {
        name: String,
        desired_state: String,
    },
    PipelineRun(PipelineRunSelector),
}

impl fmt::Display for ExternalTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalTarget::Deployment { namespace, name } => {
                write!(f, "deployment {namespace}/{name}")
            }
            ExternalTarget::GitOpsApplication {
                name,
                desired_state,
            } => write!(f, "application {name} in state {desired_state}"),
            ExternalTarget::PipelineRun(selector) => {
                write!(f, "pipeline runs in {}", selector.namespace)
            }
        }
    }
}

/// Named step of a readiness gate, each with its own poll budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Rollout,
    ApplicationSync,
    PipelineStart,
    PipelineFinish,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Rollout => "rollout",
            Phase::ApplicationSync => "application-sync",
            Phase::PipelineStart => "pipeline-start",
            Phase::PipelineFinish => "pipeline-finish",
        };
        write!(f, "{label}")
    }
}

impl ExternalTarget {
    pub fn deployment(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Deployment {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn application(name: impl Into<String>, desired_state: impl Into<String>) -> Self {
        Self::GitOpsApplication {
            name: name.into(),
            desired_state: desired_state.into(),
        }
    }

    pub fn pipeline_runs(selector: PipelineRunSelector) -> Self {
        Self::PipelineRun(selector)
    }

    /// Ordered predicates that together mean "this target has converged".
    pub fn phases(&self, executor: &DynExecutor) -> Vec<(Phase, Box<dyn Predicate>)> {
        match self {
            ExternalTarget::Deployment { namespace, name } => vec![(
                Phase::Rollout,
                Box::new(DeploymentRollout::new(executor.clone(), namespace, name)),
            )],
            ExternalTarget::GitOpsApplication {
                name,
                desired_state,
            } => vec![(
                Phase::ApplicationSync,
                Box::new(ApplicationSync::new(executor.clone(), name, desired_state)),
            )],
            ExternalTarget::PipelineRun(selector) => vec![
                (
                    Phase::PipelineStart,
                    Box::new(PipelineRunPresence::new(executor.clone(), selector.clone())),
                ),
                (
                    Phase::PipelineFinish,
                    Box::new(PipelineRunCompletion::new(executor.clone(), selector.clone())),
                ),
            ],
        }
    }
}

/// Reports of the phases a gate ran, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateReport {
    pub target: String,
    pub phases: Vec<(Phase, ConvergenceReport)>,
}

impl GateReport {
    /// Outcome of the last phase that ran; `Ready` only if every phase was.
    pub fn outcome(&self) -> Convergence {
        self.phases
            .last()
            .map(|(_, report)| report.outcome.clone())
            .unwrap_or(Convergence::Ready)
    }

    pub fn is_ready(&self) -> bool {
        self.outcome() == Convergence::Ready
    }
}

/// Wait for each phase of `target` in turn, stopping at the first phase that
/// does not become ready.
pub async fn await_target<B>(
    target: &ExternalTarget,
    executor: &DynExecutor,
    budget_for: B,
) -> Result<GateReport>
where
    B: Fn(Phase) -> PollBudget,
{
    let mut report = GateReport {
        target: target.to_string(),
        phases: Vec::new(),
    };

    for (phase, predicate) in target.phases(executor) {
        let spec = budget_for(phase).spec(predicate)?;
        let phase_report = converge(&spec).await;
        let ready = phase_report.is_ready();
        report.phases.push((phase, phase_report));
        if !ready {
            break;
        }
    }

    Ok(report)
}
