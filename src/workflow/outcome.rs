use std::fmt;
use std::time::Duration;

use super::types::WorkflowState;

/// How a single stage ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Success,
    TimedOut,
    Failed(String),
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Success => write!(f, "success"),
            StageStatus::TimedOut => write!(f, "timed out"),
            StageStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub stage: WorkflowState,
    pub status: StageStatus,
    pub elapsed: Duration,
}

impl StageResult {
    pub fn is_success(&self) -> bool {
        self.status == StageStatus::Success
    }
}

/// Terminal result returned by the sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    Succeeded,
    Aborted { stage: WorkflowState, reason: String },
}

impl WorkflowOutcome {
    pub fn aborted(stage: WorkflowState, reason: impl Into<String>) -> Self {
        Self::Aborted {
            stage,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WorkflowOutcome::Succeeded)
    }

    pub fn final_state(&self) -> WorkflowState {
        match self {
            WorkflowOutcome::Succeeded => WorkflowState::Succeeded,
            WorkflowOutcome::Aborted { .. } => WorkflowState::Aborted,
        }
    }
}
