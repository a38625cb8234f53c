use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info};

use crate::exec::{DynExecutor, Invocation};
use crate::scm::{RepoRef, ScmProvider};

const GIT: &str = "git";
const COMMITTER: [&str; 4] = [
    "-c",
    "user.name=gitops-e2e",
    "-c",
    "user.email=gitops-e2e@localhost",
];

/// Pushes generated files to the repository under test.
#[async_trait]
pub trait ResourcePublisher: Send + Sync {
    /// Commit `files` (relative to the checkout) on `branch` and push it.
    async fn publish(&self, files: &[PathBuf], branch: &str, message: &str) -> Result<()>;
}

/// Publishes with the `git` CLI through the command executor.
///
/// `checkout` is a directory owned by the publisher. Its `origin` is pointed
/// at the repository under test on every publish, and the base branch is
/// seeded when the remote does not have it yet, so a pull request always has
/// something to target.
pub struct GitPublisher {
    executor: DynExecutor,
    checkout: PathBuf,
    remote_url: String,
    base: String,
    auth_header: Option<String>,
}

impl GitPublisher {
    pub fn new(
        executor: DynExecutor,
        checkout: impl Into<PathBuf>,
        repo: &RepoRef,
        base: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            checkout: checkout.into(),
            remote_url: repo.clone_url(),
            base: base.into(),
            auth_header: None,
        }
    }

    /// Authenticate pushes with `token` using HTTP basic auth.
    pub fn with_token(mut self, provider: ScmProvider, token: &str) -> Self {
        let user = match provider {
            ScmProvider::GitHub => "x-access-token",
            ScmProvider::GitLab => "oauth2",
        };
        let credentials = STANDARD.encode(format!("{user}:{token}"));
        self.auth_header = Some(format!(
            "http.extraHeader=AUTHORIZATION: basic {credentials}"
        ));
        self
    }

    fn git<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut invocation = Invocation::new(GIT, COMMITTER);
        if let Some(header) = &self.auth_header {
            invocation = invocation.arg("-c").arg(header.clone());
        }
        invocation = invocation
            .arg("-C")
            .arg(self.checkout.display().to_string());
        args.into_iter().fold(invocation, |inv, arg| inv.arg(arg))
    }

    async fn run(&self, action: &str, invocation: Invocation) -> Result<String> {
        let output = invocation
            .run(self.executor.as_ref())
            .await
            .map_err(|e| anyhow!("git {action}: {e}"))?;
        if !output.is_success() {
            return Err(anyhow!("git {action} failed: {}", output.failure_summary()));
        }
        Ok(output.stdout)
    }

    /// Point `origin` at the repository under test and check out the base
    /// branch, creating it on the remote if it is missing.
    async fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.checkout)
            .with_context(|| format!("Unable to create {}", self.checkout.display()))?;
        let remote = self.remote_url.as_str();
        let base = self.base.as_str();

        if self.checkout.join(".git").exists() {
            self.run("remote set-url", self.git(["remote", "set-url", "origin", remote]))
                .await?;
        } else {
            info!(checkout = %self.checkout.display(), "initialising git checkout");
            self.run("init", self.git(["init"])).await?;
            self.run("remote add", self.git(["remote", "add", "origin", remote]))
                .await?;
        }

        let heads = self
            .run("ls-remote", self.git(["ls-remote", "--heads", "origin", base]))
            .await?;
        if heads.trim().is_empty() {
            debug!(base, remote, "seeding base branch");
            self.run("checkout", self.git(["checkout", "-B", base])).await?;
            self.run(
                "commit",
                self.git(["commit", "--allow-empty", "-m", "Initial commit"]),
            )
            .await?;
            self.run("push", self.git(["push", "origin", base])).await?;
        } else {
            self.run("fetch", self.git(["fetch", "origin", base])).await?;
            self.run("checkout", self.git(["checkout", "-B", base, "FETCH_HEAD"]))
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ResourcePublisher for GitPublisher {
    async fn publish(&self, files: &[PathBuf], branch: &str, message: &str) -> Result<()> {
        if files.is_empty() {
            return Err(anyhow!("nothing to publish"));
        }
        self.prepare().await?;

        self.run("checkout", self.git(["checkout", "-B", branch])).await?;

        let mut add = vec!["add".to_string(), "--".to_string()];
        add.extend(files.iter().map(|f| f.display().to_string()));
        self.run("add", self.git(add)).await?;

        self.run("commit", self.git(["commit", "-m", message])).await?;
        self.run("push", self.git(["push", "--force", "origin", branch])).await?;

        debug!(branch, files = files.len(), remote = %self.remote_url, "published resources");
        Ok(())
    }
}
