use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::ApplicationTarget;
use crate::exec::DynExecutor;
use crate::poll::Convergence;
use crate::predicates::{ExternalTarget, GateReport, PipelineRunSelector, await_target};
use crate::resources::{
    ResourcePublisher, checkout_dir, clear_workspace, sample_resources, write_resources,
};
use crate::scm::{Deletion, ScmClient};

use super::context::WorkflowContext;
use super::types::WorkflowState;

/// Control flow instruction returned by stage execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Continue,
    TimedOut(String),
    Failed(String),
}

#[async_trait]
pub trait WorkflowStage: Send + Sync {
    /// State the workflow is in once this stage succeeds.
    fn kind(&self) -> WorkflowState;

    async fn execute(&self, context: &mut WorkflowContext) -> Result<StageOutcome>;
}

/// Clears directories left behind by a previous run.
pub struct InitStage;

#[async_trait]
impl WorkflowStage for InitStage {
    fn kind(&self) -> WorkflowState {
        WorkflowState::Init
    }

    async fn execute(&self, context: &mut WorkflowContext) -> Result<StageOutcome> {
        clear_workspace(&context.config.workspace)?;
        Ok(StageOutcome::Continue)
    }
}

pub struct CreateRepositoryStage {
    scm: Arc<dyn ScmClient>,
}

impl CreateRepositoryStage {
    pub fn new(scm: Arc<dyn ScmClient>) -> Self {
        Self { scm }
    }
}

#[async_trait]
impl WorkflowStage for CreateRepositoryStage {
    fn kind(&self) -> WorkflowState {
        WorkflowState::RepoCreated
    }

    async fn execute(&self, context: &mut WorkflowContext) -> Result<StageOutcome> {
        let target = context.config.scm.gitops_repo.clone();
        let description = context.config.workflow.repository_description.clone();
        let created = self.scm.create_repository(&target, &description).await?;
        info!(repo = %created, "created GitOps repository");
        context.record_repository(created);
        Ok(StageOutcome::Continue)
    }
}

/// Writes the sample resources and pushes them on the pull request branch.
pub struct AddResourcesStage {
    publisher: Arc<dyn ResourcePublisher>,
}

impl AddResourcesStage {
    pub fn new(publisher: Arc<dyn ResourcePublisher>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl WorkflowStage for AddResourcesStage {
    fn kind(&self) -> WorkflowState {
        WorkflowState::ResourceAdded
    }

    async fn execute(&self, context: &mut WorkflowContext) -> Result<StageOutcome> {
        let checkout = checkout_dir(&context.config.workspace);
        let files = write_resources(&checkout, &sample_resources())?;
        let pull_request = &context.config.workflow.pull_request;
        self.publisher
            .publish(&files, &pull_request.head, &pull_request.title)
            .await?;
        context.record_published(&files);
        Ok(StageOutcome::Continue)
    }
}

pub struct CreatePullRequestStage {
    scm: Arc<dyn ScmClient>,
}

impl CreatePullRequestStage {
    pub fn new(scm: Arc<dyn ScmClient>) -> Self {
        Self { scm }
    }
}

#[async_trait]
impl WorkflowStage for CreatePullRequestStage {
    fn kind(&self) -> WorkflowState {
        WorkflowState::PrCreated
    }

    async fn execute(&self, context: &mut WorkflowContext) -> Result<StageOutcome> {
        let repo = context
            .repository
            .clone()
            .ok_or_else(|| anyhow!("no repository to open a pull request against"))?;
        let pull_request = self
            .scm
            .create_pull_request(&repo, &context.config.workflow.pull_request)
            .await?;
        info!(number = pull_request.number, url = ?pull_request.url, "opened pull request");
        context.record_pull_request(pull_request);
        Ok(StageOutcome::Continue)
    }
}

/// Waits for the CI pipeline triggered by the pull request to start and pass.
pub struct AwaitChecksStage {
    executor: DynExecutor,
}

impl AwaitChecksStage {
    pub fn new(executor: DynExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl WorkflowStage for AwaitChecksStage {
    fn kind(&self) -> WorkflowState {
        WorkflowState::ChecksAwaited
    }

    async fn execute(&self, context: &mut WorkflowContext) -> Result<StageOutcome> {
        let workflow = &context.config.workflow;
        let mut selector = PipelineRunSelector::new(&workflow.ci_namespace);
        if let Some(field_selector) = &workflow.pipeline_field_selector {
            selector = selector.with_field_selector(field_selector);
        }

        let waits = context.config.waits;
        let target = ExternalTarget::pipeline_runs(selector);
        let report = await_target(&target, &self.executor, |phase| waits.for_phase(phase)).await?;
        Ok(gate_outcome(&report))
    }
}

pub struct MergeStage {
    scm: Arc<dyn ScmClient>,
}

impl MergeStage {
    pub fn new(scm: Arc<dyn ScmClient>) -> Self {
        Self { scm }
    }
}

#[async_trait]
impl WorkflowStage for MergeStage {
    fn kind(&self) -> WorkflowState {
        WorkflowState::Merged
    }

    async fn execute(&self, context: &mut WorkflowContext) -> Result<StageOutcome> {
        let (Some(repo), Some(pull_request)) = (&context.repository, &context.pull_request) else {
            return Err(anyhow!("no pull request to merge"));
        };
        self.scm.merge_pull_request(repo, pull_request).await?;
        info!(number = pull_request.number, "merged pull request");
        Ok(StageOutcome::Continue)
    }
}

/// Waits for the CD application to report the expected state.
pub struct SyncStage {
    executor: DynExecutor,
    application: ApplicationTarget,
}

impl SyncStage {
    pub fn new(executor: DynExecutor, application: ApplicationTarget) -> Self {
        Self {
            executor,
            application,
        }
    }
}

#[async_trait]
impl WorkflowStage for SyncStage {
    fn kind(&self) -> WorkflowState {
        WorkflowState::Synced
    }

    async fn execute(&self, context: &mut WorkflowContext) -> Result<StageOutcome> {
        let waits = context.config.waits;
        let target = ExternalTarget::application(&self.application.name, &self.application.state);
        let report = await_target(&target, &self.executor, |phase| waits.for_phase(phase)).await?;
        Ok(gate_outcome(&report))
    }
}

/// Deletes the configured GitOps repository, whether or not this run got as
/// far as creating it.
pub struct CleanupStage {
    scm: Arc<dyn ScmClient>,
}

impl CleanupStage {
    pub fn new(scm: Arc<dyn ScmClient>) -> Self {
        Self { scm }
    }
}

#[async_trait]
impl WorkflowStage for CleanupStage {
    fn kind(&self) -> WorkflowState {
        WorkflowState::Cleanup
    }

    async fn execute(&self, context: &mut WorkflowContext) -> Result<StageOutcome> {
        let repo = context
            .repository
            .clone()
            .unwrap_or_else(|| context.config.scm.gitops_repo.clone());

        match self.scm.delete_repository(&repo).await? {
            Deletion::Deleted => info!(repo = %repo, "deleted GitOps repository"),
            Deletion::AlreadyAbsent => {
                warn!(repo = %repo, "GitOps repository did not exist; nothing to delete");
                context.record_stage_skip(self.kind(), format!("{repo} did not exist"));
            }
        }
        Ok(StageOutcome::Continue)
    }
}

fn gate_outcome(report: &GateReport) -> StageOutcome {
    match report.outcome() {
        Convergence::Ready => StageOutcome::Continue,
        Convergence::TimedOut => {
            let detail = report
                .phases
                .last()
                .map(|(phase, phase_report)| {
                    format!(
                        "{phase} wait for {} exceeded {}s",
                        report.target,
                        phase_report.deadline.as_secs()
                    )
                })
                .unwrap_or_else(|| format!("wait for {} timed out", report.target));
            StageOutcome::TimedOut(detail)
        }
        Convergence::Failed(reason) => StageOutcome::Failed(format!("{}: {reason}", report.target)),
    }
}
