//! The e2e workflow: a linear state machine whose stages create a GitOps
//! repository, drive a pull request through CI and tear everything down.

mod context;
mod orchestrator;
mod outcome;
mod stages;
mod types;

pub use context::WorkflowRun;
pub use orchestrator::{Collaborators, Sequencer};
pub use outcome::{StageStatus, WorkflowOutcome};
