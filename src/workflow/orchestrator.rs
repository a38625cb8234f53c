use std::sync::Arc;

use anyhow::{Result, bail};
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::{Config, WorkflowSettings};
use crate::exec::DynExecutor;
use crate::resources::ResourcePublisher;
use crate::scm::ScmClient;

use super::context::{WorkflowContext, WorkflowEvent, WorkflowRun};
use super::outcome::WorkflowOutcome;
use super::stages::{
    AddResourcesStage, AwaitChecksStage, CleanupStage, CreatePullRequestStage,
    CreateRepositoryStage, InitStage, MergeStage, StageOutcome, SyncStage, WorkflowStage,
};
use super::types::WorkflowState;

/// External systems the standard stages talk to.
#[derive(Clone)]
pub struct Collaborators {
    pub scm: Arc<dyn ScmClient>,
    pub executor: DynExecutor,
    pub publisher: Arc<dyn ResourcePublisher>,
}

/// Runs stages strictly in order, then the cleanup stage exactly once.
pub struct Sequencer {
    stages: Vec<Box<dyn WorkflowStage>>,
    cleanup: Box<dyn WorkflowStage>,
}

impl Sequencer {
    pub fn builder() -> SequencerBuilder {
        SequencerBuilder::new()
    }

    pub fn stage_kinds(&self) -> Vec<WorkflowState> {
        self.stages
            .iter()
            .chain(std::iter::once(&self.cleanup))
            .map(|stage| stage.kind())
            .collect()
    }

    pub async fn run(&self, config: Config) -> WorkflowRun {
        let mut context = WorkflowContext::new(config);
        let mut aborted: Option<(WorkflowState, String)> = None;

        for stage in &self.stages {
            if let Err(reason) = run_stage(stage.as_ref(), &mut context).await {
                warn!(stage = %stage.kind(), %reason, "workflow aborted");
                aborted = Some((stage.kind(), reason));
                break;
            }
        }

        let cleanup = run_stage(self.cleanup.as_ref(), &mut context).await;
        if let Err(reason) = &cleanup {
            error!(%reason, "cleanup failed");
            context.record_event(WorkflowEvent::CleanupFailed(reason.clone()));
        }

        let outcome = match (aborted, cleanup) {
            (Some((stage, reason)), _) => WorkflowOutcome::aborted(stage, reason),
            (None, Err(reason)) => WorkflowOutcome::aborted(WorkflowState::Cleanup, reason),
            (None, Ok(())) => WorkflowOutcome::Succeeded,
        };
        info!(outcome = %outcome.final_state(), "workflow finished");
        context.into_run(outcome)
    }
}

/// Execute one stage, recording its result. `Err` carries the abort reason.
async fn run_stage(
    stage: &dyn WorkflowStage,
    context: &mut WorkflowContext,
) -> std::result::Result<(), String> {
    let kind = stage.kind();
    let started = Instant::now();
    context.record_stage_start(kind);
    info!(stage = %kind, from = %context.state(), "stage started");

    match stage.execute(context).await {
        Ok(StageOutcome::Continue) => {
            context.record_stage_end(kind, started.elapsed());
            context.transition(kind);
            Ok(())
        }
        Ok(StageOutcome::TimedOut(reason)) => {
            context.record_stage_timeout(kind, &reason, started.elapsed());
            Err(reason)
        }
        Ok(StageOutcome::Failed(reason)) => {
            context.record_stage_failure(kind, &reason, started.elapsed());
            Err(reason)
        }
        Err(error) => {
            let message = format!("{error:#}");
            context.record_stage_failure(kind, &message, started.elapsed());
            Err(message)
        }
    }
}

pub struct SequencerBuilder {
    stages: Vec<Box<dyn WorkflowStage>>,
    cleanup: Option<Box<dyn WorkflowStage>>,
}

impl SequencerBuilder {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            cleanup: None,
        }
    }

    pub fn add_stage<S>(mut self, stage: S) -> Self
    where
        S: WorkflowStage + 'static,
    {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn with_cleanup<S>(mut self, stage: S) -> Self
    where
        S: WorkflowStage + 'static,
    {
        self.cleanup = Some(Box::new(stage));
        self
    }

    /// The e2e flow: create, publish, review, wait, merge, optionally wait
    /// for the application, and delete the repository afterwards.
    pub fn with_standard_stages(
        self,
        settings: &WorkflowSettings,
        collaborators: &Collaborators,
    ) -> Self {
        let builder = self
            .add_stage(InitStage)
            .add_stage(CreateRepositoryStage::new(collaborators.scm.clone()))
            .add_stage(AddResourcesStage::new(collaborators.publisher.clone()))
            .add_stage(CreatePullRequestStage::new(collaborators.scm.clone()))
            .add_stage(AwaitChecksStage::new(collaborators.executor.clone()))
            .add_stage(MergeStage::new(collaborators.scm.clone()));

        let builder = match &settings.application {
            Some(application) => builder.add_stage(SyncStage::new(
                collaborators.executor.clone(),
                application.clone(),
            )),
            None => builder,
        };

        builder.with_cleanup(CleanupStage::new(collaborators.scm.clone()))
    }

    pub fn build(self) -> Result<Sequencer> {
        let Some(cleanup) = self.cleanup else {
            bail!("a workflow needs a cleanup stage");
        };
        Ok(Sequencer {
            stages: self.stages,
            cleanup,
        })
    }
}

impl Default for SequencerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
