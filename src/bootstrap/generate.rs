use std::path::PathBuf;

use anyhow::{Result, bail};
use tracing::info;

use crate::config::Config;
use crate::exec::{CommandExecutor, Invocation};
use crate::resources::BOOTSTRAP_OUTPUT_DIR;

const KAM: &str = "kam";
const ENV_NAME: &str = "new-env";
const APP_NAME: &str = "app-bus";
const SERVICE_NAME: &str = "bus";

/// Run `kam bootstrap` with the configured repositories, then add the bus
/// service to `new-env`. Returns the generated tree under the workspace.
pub async fn generate_resources(executor: &dyn CommandExecutor, config: &Config) -> Result<PathBuf> {
    let repos = &config.repositories;
    let output = config.workspace.join(BOOTSTRAP_OUTPUT_DIR);
    let output_arg = output.display().to_string();
    let docker_config = repos.docker_config_json.display().to_string();

    run_kam(
        executor,
        Invocation::new(
            KAM,
            [
                "bootstrap",
                "--service-repo-url",
                repos.service_repo_url.as_str(),
                "--gitops-repo-url",
                repos.gitops_repo_url.as_str(),
                "--image-repo",
                repos.image_repo.as_str(),
                "--dockercfgjson",
                docker_config.as_str(),
                "--git-host-access-token",
                config.scm.access_token.as_str(),
                "--output",
                output_arg.as_str(),
                "--overwrite",
            ],
        ),
    )
    .await?;

    run_kam(
        executor,
        Invocation::new(
            KAM,
            [
                "service",
                "add",
                "--env-name",
                ENV_NAME,
                "--app-name",
                APP_NAME,
                "--service-name",
                SERVICE_NAME,
                "--git-repo-url",
                repos.bus_repo_url.as_str(),
                "--pipelines-folder",
                output_arg.as_str(),
            ],
        ),
    )
    .await?;

    if !output.is_dir() {
        bail!("kam reported success but {} was not created", output.display());
    }
    info!(output = %output.display(), "generated GitOps resources");
    Ok(output)
}

async fn run_kam(executor: &dyn CommandExecutor, invocation: Invocation) -> Result<()> {
    let subcommand = invocation.args.first().cloned().unwrap_or_default();
    let output = invocation.run(executor).await?;
    if !output.is_success() {
        bail!("kam {subcommand} failed: {}", output.failure_summary());
    }
    Ok(())
}
