use std::fmt;

/// States of the e2e workflow. Every non-terminal state is reached by the
/// stage of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    Init,
    RepoCreated,
    ResourceAdded,
    PrCreated,
    ChecksAwaited,
    Merged,
    Synced,
    Cleanup,
    Succeeded,
    Aborted,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkflowState::Init => "init",
            WorkflowState::RepoCreated => "repo-created",
            WorkflowState::ResourceAdded => "resource-added",
            WorkflowState::PrCreated => "pr-created",
            WorkflowState::ChecksAwaited => "checks-awaited",
            WorkflowState::Merged => "merged",
            WorkflowState::Synced => "synced",
            WorkflowState::Cleanup => "cleanup",
            WorkflowState::Succeeded => "succeeded",
            WorkflowState::Aborted => "aborted",
        };
        write!(f, "{label}")
    }
}
