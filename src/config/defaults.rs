use std::time::Duration;

use crate::poll::PollBudget;
use crate::scm::PullRequestSpec;

use super::constants::*;
use super::types::{WaitSettings, WorkflowSettings};

fn budget(deadline_secs: u64) -> PollBudget {
    PollBudget::new(
        Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        Duration::from_secs(deadline_secs),
    )
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            rollout: budget(DEFAULT_ROLLOUT_DEADLINE_SECS),
            application_sync: budget(DEFAULT_SYNC_DEADLINE_SECS),
            pipeline_start: budget(DEFAULT_PIPELINE_START_DEADLINE_SECS),
            pipeline_finish: budget(DEFAULT_PIPELINE_FINISH_DEADLINE_SECS),
        }
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            pull_request: PullRequestSpec {
                title: PULL_REQUEST_TITLE.to_string(),
                body: PULL_REQUEST_TITLE.to_string(),
                head: PULL_REQUEST_HEAD.to_string(),
                base: PULL_REQUEST_BASE.to_string(),
            },
            repository_description: REPOSITORY_DESCRIPTION.to_string(),
            gitops_namespace: GITOPS_NAMESPACE.to_string(),
            operator_deployments: OPERATOR_DEPLOYMENTS.iter().map(|d| d.to_string()).collect(),
            ci_namespace: CI_NAMESPACE.to_string(),
            pipeline_field_selector: None,
            application: None,
        }
    }
}
