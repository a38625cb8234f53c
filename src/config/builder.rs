use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::error::ConvergenceError;
use crate::scm::RepoRef;

use super::constants::*;
use super::types::{
    CiMode, Config, RepositorySettings, ScmSettings, WaitSettings, WorkflowSettings,
};

/// Raw repository coordinates; any of them may still be missing.
#[derive(Debug, Default, Clone)]
pub struct RepositoryInputs {
    pub service_repo_url: Option<String>,
    pub gitops_repo_url: Option<String>,
    pub bus_repo_url: Option<String>,
    pub image_repo: Option<String>,
    pub docker_config_json: Option<PathBuf>,
    pub access_token: Option<String>,
}

#[derive(Debug)]
pub struct ConfigBuilder {
    pub(super) ci: CiMode,
    pub(super) repositories: RepositoryInputs,
    pub(super) scm_api_url: Option<String>,
    pub(super) workspace: PathBuf,
    pub(super) waits: WaitSettings,
    pub(super) workflow: WorkflowSettings,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            ci: CiMode::Local,
            repositories: RepositoryInputs::default(),
            scm_api_url: None,
            workspace: PathBuf::from("."),
            waits: WaitSettings::default(),
            workflow: WorkflowSettings::default(),
        }
    }

    pub fn with_ci(mut self, ci: CiMode) -> Self {
        self.ci = ci;
        self
    }

    pub fn with_repositories<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut RepositoryInputs),
    {
        update(&mut self.repositories);
        self
    }

    pub fn with_scm_api_url(mut self, url: impl Into<String>) -> Self {
        self.scm_api_url = Some(url.into());
        self
    }

    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = workspace.into();
        self
    }

    pub fn with_waits<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut WaitSettings),
    {
        update(&mut self.waits);
        self
    }

    pub fn with_workflow<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut WorkflowSettings),
    {
        update(&mut self.workflow);
        self
    }

    pub fn build(self) -> Result<Config> {
        let inputs = self.repositories;
        let sources = match self.ci {
            CiMode::Local => REQUIRED_LOCAL_VARS,
            CiMode::Prow => REQUIRED_PROW_VARS,
        };
        // Same order as `sources`.
        let present = [
            inputs.service_repo_url.is_some(),
            inputs.gitops_repo_url.is_some(),
            inputs.image_repo.is_some(),
            inputs.docker_config_json.is_some(),
            inputs.access_token.is_some(),
            inputs.bus_repo_url.is_some(),
        ];
        let missing = sources
            .iter()
            .zip(present)
            .filter_map(|(name, present)| (!present).then_some(*name))
            .collect::<Vec<_>>();

        if !missing.is_empty() {
            let verb = if missing.len() == 1 { "is" } else { "are" };
            return Err(ConvergenceError::configuration(format!(
                "{} {verb} not set",
                missing.join(", ")
            ))
            .into());
        }

        let repositories = RepositorySettings {
            service_repo_url: inputs.service_repo_url.unwrap_or_default(),
            gitops_repo_url: inputs.gitops_repo_url.unwrap_or_default(),
            bus_repo_url: inputs.bus_repo_url.unwrap_or_default(),
            image_repo: inputs.image_repo.unwrap_or_default(),
            docker_config_json: inputs.docker_config_json.unwrap_or_default(),
        };

        let gitops_repo = RepoRef::parse(&repositories.gitops_repo_url)
            .with_context(|| format!("{ENV_GITOPS_REPO_URL} is not a usable repository URL"))?;

        Ok(Config {
            ci: self.ci,
            scm: ScmSettings {
                gitops_repo,
                access_token: inputs.access_token.unwrap_or_default(),
                api_url: self.scm_api_url,
            },
            repositories,
            workspace: self.workspace,
            waits: self.waits,
            workflow: self.workflow,
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
