use std::env;
use std::path::PathBuf;

use anyhow::{Result, anyhow};

use crate::error::ConvergenceError;

use super::builder::ConfigBuilder;
use super::constants::*;
use super::types::CiMode;

/// Reads one variable; `Ok(None)` when it is not set.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Result<Option<String>>;

pub fn detect_ci_mode(lookup: Lookup<'_>) -> Result<CiMode> {
    match lookup(ENV_CI)? {
        None => Ok(CiMode::Local),
        Some(value) if value == "prow" => Ok(CiMode::Prow),
        Some(value) => Err(ConvergenceError::configuration(format!(
            "{ENV_CI}={value}: the e2e suite cannot run locally against OpenShift CI"
        ))
        .into()),
    }
}

/// Layer environment variables over `builder`.
///
/// `server_version` is the cluster's `<major><minor>` string and is only
/// consulted in prow mode, where it becomes part of the GitOps repository name.
pub fn apply_env_overrides(
    mut builder: ConfigBuilder,
    lookup: Lookup<'_>,
    server_version: Option<&str>,
) -> Result<ConfigBuilder> {
    let ci = detect_ci_mode(lookup)?;
    builder = builder.with_ci(ci);

    builder = match ci {
        CiMode::Local => {
            let service = lookup(ENV_SERVICE_REPO_URL)?;
            let gitops = lookup(ENV_GITOPS_REPO_URL)?;
            let image = lookup(ENV_IMAGE_REPO)?;
            let docker_config = lookup(ENV_DOCKERCONFIGJSON_PATH)?;
            let token = lookup(ENV_GIT_ACCESS_TOKEN)?;
            let bus = lookup(ENV_BUS_REPO_URL)?;
            builder.with_repositories(|repos| {
                repos.service_repo_url = service.or(repos.service_repo_url.take());
                repos.gitops_repo_url = gitops.or(repos.gitops_repo_url.take());
                repos.image_repo = image.or(repos.image_repo.take());
                repos.docker_config_json = docker_config
                    .map(PathBuf::from)
                    .or(repos.docker_config_json.take());
                repos.access_token = token.or(repos.access_token.take());
                repos.bus_repo_url = bus.or(repos.bus_repo_url.take());
            })
        }
        CiMode::Prow => {
            let version = server_version.ok_or_else(|| {
                anyhow!("OpenShift API server version not found; required in prow mode")
            })?;
            let pr_number = lookup(ENV_PRNO)?.unwrap_or_default();
            let docker_config = lookup(ENV_QUAY_DOCKER_CONF)?;
            let token = lookup(ENV_GITHUB_TOKEN)?;
            builder.with_repositories(|repos| {
                repos.service_repo_url = Some(PROW_SERVICE_REPO_URL.to_string());
                repos.gitops_repo_url =
                    Some(format!("{PROW_GITOPS_REPO_PREFIX}{pr_number}{version}"));
                repos.image_repo = Some(PROW_IMAGE_REPO.to_string());
                repos.bus_repo_url = Some(PROW_BUS_REPO_URL.to_string());
                repos.docker_config_json = docker_config.map(PathBuf::from);
                repos.access_token = token;
            })
        }
    };

    if let Some(workspace) = lookup(ENV_WORKSPACE)? {
        builder = builder.with_workspace(workspace);
    }

    if let Some(api_url) = lookup(ENV_SCM_API_URL)? {
        builder = builder.with_scm_api_url(api_url);
    }

    if let Some(namespace) = lookup(ENV_CI_NAMESPACE)? {
        builder = builder.with_workflow(|workflow| workflow.ci_namespace = namespace);
    }

    Ok(builder)
}

pub fn env_string(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(val) => Ok(Some(val)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(anyhow!("{key} contains invalid UTF-8")),
    }
}
