use anyhow::Result;

use crate::error::ConvergenceError;

use super::constants::ENV_GIT_ACCESS_TOKEN;
use super::types::{CiMode, Config};

pub fn validate(config: &Config) -> Result<()> {
    if config.scm.access_token.trim().is_empty() {
        let source = match config.ci {
            CiMode::Local => ENV_GIT_ACCESS_TOKEN,
            CiMode::Prow => config.scm.gitops_repo.provider.token_env_var(),
        };
        return Err(ConvergenceError::configuration(format!(
            "{} access token is empty; set {source}",
            config.scm.gitops_repo.provider
        ))
        .into());
    }

    let waits = &config.waits;
    for (name, budget) in [
        ("rollout", waits.rollout),
        ("application_sync", waits.application_sync),
        ("pipeline_start", waits.pipeline_start),
        ("pipeline_finish", waits.pipeline_finish),
    ] {
        budget.validate().map_err(|e| {
            ConvergenceError::configuration(format!("waits.{name}: {e}"))
        })?;
    }

    if config.workflow.ci_namespace.trim().is_empty() {
        return Err(ConvergenceError::configuration("CI namespace must not be empty").into());
    }

    Ok(())
}
