use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use super::commands;

/// Entry point for the `gitops-e2e` command-line interface.
#[derive(Debug, Parser)]
#[command(
    name = "gitops-e2e",
    about = "End-to-end convergence checks for a GitOps bootstrap",
    version,
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// JSON configuration file (defaults to ~/.gitops-e2e/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the GitOps repository, push a service, wait for CI, merge and clean up.
    Run(RunArgs),
    /// Wait for the GitOps operator and log the argocd CLI in.
    Bootstrap,
    /// Generate the GitOps tree with `kam bootstrap` and add the bus service.
    Generate,
    /// Wait for a single target to converge.
    Wait(WaitArgs),
    /// Delete the repository named by GITOPS_REPO_URL.
    Cleanup,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Assume the operator is ready and argocd is already logged in.
    #[arg(long)]
    pub skip_bootstrap: bool,
}

#[derive(Debug, Args)]
pub struct WaitArgs {
    #[command(subcommand)]
    pub target: WaitTarget,

    /// Seconds between evaluations (overrides the configured budget).
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Seconds before giving up (overrides the configured budget).
    #[arg(long, global = true)]
    pub deadline: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum WaitTarget {
    /// A deployment rollout.
    Deployment {
        name: String,
        #[arg(short = 'n', long, default_value = "openshift-gitops")]
        namespace: String,
    },
    /// An Argo CD application reaching a state.
    Application {
        name: String,
        #[arg(long, default_value = "Synced")]
        state: String,
    },
    /// Pipeline runs starting and then succeeding.
    Pipeline {
        /// Defaults to the configured CI namespace.
        #[arg(short = 'n', long)]
        namespace: Option<String>,
        #[arg(long)]
        field_selector: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        commands::run(self).await
    }
}
