use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::scm::{PullRequestRef, RepoRef};

use super::outcome::{StageResult, StageStatus, WorkflowOutcome};
use super::types::WorkflowState;

/// Mutable context threaded through the workflow stages.
#[derive(Debug, Clone)]
pub struct WorkflowContext {
    pub config: Config,
    /// Set once the repository has been created by this run.
    pub repository: Option<RepoRef>,
    pub pull_request: Option<PullRequestRef>,
    state: WorkflowState,
    results: Vec<StageResult>,
    events: Vec<WorkflowEvent>,
}

impl WorkflowContext {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            repository: None,
            pull_request: None,
            state: WorkflowState::Init,
            results: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn record_event(&mut self, event: WorkflowEvent) {
        self.events.push(event);
    }

    pub fn transition(&mut self, to: WorkflowState) {
        let from = self.state;
        self.state = to;
        self.record_event(WorkflowEvent::Transition { from, to });
    }

    pub fn record_stage_start(&mut self, stage: WorkflowState) {
        self.record_event(WorkflowEvent::StageStarted(stage));
    }

    pub fn record_stage_end(&mut self, stage: WorkflowState, elapsed: Duration) {
        self.record_event(WorkflowEvent::StageCompleted(stage));
        self.push_result(stage, StageStatus::Success, elapsed);
    }

    pub fn record_stage_timeout(&mut self, stage: WorkflowState, reason: &str, elapsed: Duration) {
        self.record_event(WorkflowEvent::StageTimedOut {
            stage,
            reason: reason.to_string(),
        });
        self.push_result(stage, StageStatus::TimedOut, elapsed);
    }

    pub fn record_stage_failure(&mut self, stage: WorkflowState, error: &str, elapsed: Duration) {
        self.record_event(WorkflowEvent::StageFailed {
            stage,
            error: error.to_string(),
        });
        self.push_result(stage, StageStatus::Failed(error.to_string()), elapsed);
    }

    pub fn record_stage_skip(&mut self, stage: WorkflowState, reason: impl Into<String>) {
        self.record_event(WorkflowEvent::StageSkipped {
            stage,
            reason: reason.into(),
        });
    }

    pub fn record_repository(&mut self, repo: RepoRef) {
        self.record_event(WorkflowEvent::RepositoryCreated(repo.to_string()));
        self.repository = Some(repo);
    }

    pub fn record_published(&mut self, files: &[PathBuf]) {
        self.record_event(WorkflowEvent::ResourcesPublished { files: files.len() });
    }

    pub fn record_pull_request(&mut self, pull_request: PullRequestRef) {
        self.record_event(WorkflowEvent::PullRequestOpened {
            number: pull_request.number,
        });
        self.pull_request = Some(pull_request);
    }

    pub fn into_run(mut self, outcome: WorkflowOutcome) -> WorkflowRun {
        self.transition(outcome.final_state());
        let WorkflowContext {
            results, events, ..
        } = self;
        WorkflowRun {
            outcome,
            results,
            events,
        }
    }

    fn push_result(&mut self, stage: WorkflowState, status: StageStatus, elapsed: Duration) {
        self.results.push(StageResult {
            stage,
            status,
            elapsed,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRun {
    pub outcome: WorkflowOutcome,
    pub results: Vec<StageResult>,
    pub events: Vec<WorkflowEvent>,
}

impl WorkflowRun {
    pub fn final_state(&self) -> WorkflowState {
        self.outcome.final_state()
    }
}

/// Audit events emitted while the workflow progresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    StageStarted(WorkflowState),
    StageCompleted(WorkflowState),
    StageSkipped { stage: WorkflowState, reason: String },
    StageTimedOut { stage: WorkflowState, reason: String },
    StageFailed { stage: WorkflowState, error: String },
    Transition { from: WorkflowState, to: WorkflowState },
    RepositoryCreated(String),
    ResourcesPublished { files: usize },
    PullRequestOpened { number: u64 },
    CleanupFailed(String),
}
