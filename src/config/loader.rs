use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs::home_dir;
use tracing::debug;

use crate::bootstrap::openshift_server_version;
use crate::exec::CommandExecutor;

use super::builder::ConfigBuilder;
use super::constants::{CONFIG_DIR, CONFIG_FILE};
use super::environment::{Lookup, apply_env_overrides, detect_ci_mode, env_string};
use super::types::{CiMode, FileConfig};
use super::validation::validate;
use super::Config;

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        let mut path = home_dir().context("Could not determine home directory")?;
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        Ok(path)
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Load from the process environment. In prow mode the cluster is asked
    /// for its server version before anything else is derived.
    pub async fn load(file: Option<&Path>, executor: &dyn CommandExecutor) -> Result<Self> {
        let server_version = match detect_ci_mode(&env_string)? {
            CiMode::Prow => Some(openshift_server_version(executor).await?),
            CiMode::Local => None,
        };
        Self::load_with(file, &env_string, server_version.as_deref())
    }

    pub fn load_with(
        file: Option<&Path>,
        lookup: Lookup<'_>,
        server_version: Option<&str>,
    ) -> Result<Self> {
        let mut builder = ConfigBuilder::new();

        match file {
            Some(path) => builder = Self::apply_file(builder, path)?,
            None => {
                let path = Self::config_path()?;
                if path.exists() {
                    builder = Self::apply_file(builder, &path)?;
                }
            }
        }

        builder = apply_env_overrides(builder, lookup, server_version)?;

        let config = builder.build()?;
        validate(&config)?;
        debug!(ci = ?config.ci, gitops_repo = %config.scm.gitops_repo, "configuration loaded");
        Ok(config)
    }

    fn apply_file(builder: ConfigBuilder, path: &Path) -> Result<ConfigBuilder> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed reading config at {}", path.display()))?;

        if contents.trim().is_empty() {
            return Ok(builder);
        }

        let file: FileConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed parsing JSON config at {}", path.display()))?;

        Ok(file.apply(builder))
    }
}

impl FileConfig {
    pub fn apply(self, mut builder: ConfigBuilder) -> ConfigBuilder {
        if let Some(workspace) = self.workspace {
            builder = builder.with_workspace(workspace);
        }
        if let Some(api_url) = self.scm_api_url {
            builder = builder.with_scm_api_url(api_url);
        }

        let waits = self.waits;
        builder
            .with_waits(|settings| {
                if let Some(budget) = waits.rollout {
                    settings.rollout = budget;
                }
                if let Some(budget) = waits.application_sync {
                    settings.application_sync = budget;
                }
                if let Some(budget) = waits.pipeline_start {
                    settings.pipeline_start = budget;
                }
                if let Some(budget) = waits.pipeline_finish {
                    settings.pipeline_finish = budget;
                }
            })
            .with_workflow(|workflow| {
                if let Some(namespace) = self.ci_namespace {
                    workflow.ci_namespace = namespace;
                }
                if self.pipeline_field_selector.is_some() {
                    workflow.pipeline_field_selector = self.pipeline_field_selector;
                }
                if self.application.is_some() {
                    workflow.application = self.application;
                }
            })
    }
}
