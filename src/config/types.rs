use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

use crate::poll::PollBudget;
use crate::predicates::Phase;
use crate::scm::{PullRequestSpec, RepoRef};

#[derive(Debug, Clone)]
pub struct Config {
    pub ci: CiMode,
    pub repositories: RepositorySettings,
    pub scm: ScmSettings,
    pub workspace: PathBuf,
    pub waits: WaitSettings,
    pub workflow: WorkflowSettings,
}

/// How the harness was launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CiMode {
    Local,
    /// OpenShift CI; repository coordinates are derived, not read.
    Prow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySettings {
    pub service_repo_url: String,
    pub gitops_repo_url: String,
    pub bus_repo_url: String,
    pub image_repo: String,
    pub docker_config_json: PathBuf,
}

#[derive(Clone)]
pub struct ScmSettings {
    /// GitOps repository, resolved once; its provider drives every SCM call.
    pub gitops_repo: RepoRef,
    pub access_token: String,
    pub api_url: Option<String>,
}

impl fmt::Debug for ScmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScmSettings")
            .field("gitops_repo", &self.gitops_repo)
            .field("access_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSettings {
    pub rollout: PollBudget,
    pub application_sync: PollBudget,
    pub pipeline_start: PollBudget,
    pub pipeline_finish: PollBudget,
}

impl WaitSettings {
    pub fn for_phase(&self, phase: Phase) -> PollBudget {
        match phase {
            Phase::Rollout => self.rollout,
            Phase::ApplicationSync => self.application_sync,
            Phase::PipelineStart => self.pipeline_start,
            Phase::PipelineFinish => self.pipeline_finish,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApplicationTarget {
    pub name: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub pull_request: PullRequestSpec,
    pub repository_description: String,
    pub gitops_namespace: String,
    pub operator_deployments: Vec<String>,
    pub ci_namespace: String,
    pub pipeline_field_selector: Option<String>,
    /// When set, the workflow waits for this application after merging.
    pub application: Option<ApplicationTarget>,
}

// File configuration types
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct FileConfig {
    pub workspace: Option<PathBuf>,
    pub scm_api_url: Option<String>,
    pub ci_namespace: Option<String>,
    pub pipeline_field_selector: Option<String>,
    pub application: Option<ApplicationTarget>,
    #[serde(default)]
    pub waits: FileWaitSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct FileWaitSettings {
    pub rollout: Option<PollBudget>,
    pub application_sync: Option<PollBudget>,
    pub pipeline_start: Option<PollBudget>,
    pub pipeline_finish: Option<PollBudget>,
}
