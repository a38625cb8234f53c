//! Source-control providers used to create, review and delete the GitOps
//! repository under test.

mod github;
mod gitlab;

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use github::GitHubClient;
use gitlab::GitLabClient;

const HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScmProvider {
    GitHub,
    GitLab,
}

impl fmt::Display for ScmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScmProvider::GitHub => write!(f, "github"),
            ScmProvider::GitLab => write!(f, "gitlab"),
        }
    }
}

impl ScmProvider {
    /// Pick the provider from a repository host such as `github.com`.
    pub fn from_host(host: &str) -> Result<Self> {
        let host = host.to_ascii_lowercase();
        if host.contains("github") {
            Ok(ScmProvider::GitHub)
        } else if host.contains("gitlab") {
            Ok(ScmProvider::GitLab)
        } else {
            bail!("SCM host '{host}' is not supported (expected GitHub or GitLab)")
        }
    }

    /// REST API root for a host when no override is configured.
    pub fn default_api_url(self, host: &str) -> String {
        match self {
            ScmProvider::GitHub if host == "github.com" => "https://api.github.com".to_string(),
            ScmProvider::GitHub => format!("https://{host}/api/v3"),
            ScmProvider::GitLab => format!("https://{host}/api/v4"),
        }
    }

    pub fn token_env_var(self) -> &'static str {
        match self {
            ScmProvider::GitHub => "GITHUB_TOKEN",
            ScmProvider::GitLab => "GITLAB_TOKEN",
        }
    }
}

/// Repository identity, derived once from its clone URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub provider: ScmProvider,
    pub host: String,
    /// User, organisation or group path (GitLab groups may be nested).
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url.trim())
            .with_context(|| format!("failed to parse repository URL {url:?}"))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| anyhow!("repository URL {url:?} has no host"))?
            .to_string();
        let provider = ScmProvider::from_host(&host)?;

        let path = parsed.path().trim_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        let (owner, name) = path
            .rsplit_once('/')
            .filter(|(owner, name)| !owner.is_empty() && !name.is_empty())
            .ok_or_else(|| anyhow!("repository URL {url:?} must look like <host>/<owner>/<name>"))?;

        Ok(Self {
            provider,
            host,
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn clone_url(&self) -> String {
        format!("https://{}/{}.git", self.host, self.full_name())
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.host, self.full_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestSpec {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub number: u64,
    pub head: String,
    pub url: Option<String>,
}

/// Result of a repository delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Deleted,
    /// The server answered 404; there was nothing to delete.
    AlreadyAbsent,
}

#[async_trait]
pub trait ScmClient: Send + Sync {
    fn provider(&self) -> ScmProvider;

    async fn create_repository(&self, repo: &RepoRef, description: &str) -> Result<RepoRef>;

    async fn delete_repository(&self, repo: &RepoRef) -> Result<Deletion>;

    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        spec: &PullRequestSpec,
    ) -> Result<PullRequestRef>;

    async fn merge_pull_request(&self, repo: &RepoRef, pull_request: &PullRequestRef)
    -> Result<()>;
}

/// Build the client for `repo`'s provider.
pub fn client_for(
    repo: &RepoRef,
    token: &str,
    api_url: Option<&str>,
) -> Result<Box<dyn ScmClient>> {
    let api_url = api_url
        .map(str::to_string)
        .unwrap_or_else(|| repo.provider.default_api_url(&repo.host));
    let http = http_client()?;

    Ok(match repo.provider {
        ScmProvider::GitHub => Box::new(GitHubClient::new(http, api_url, token)),
        ScmProvider::GitLab => Box::new(GitLabClient::new(http, api_url, token)),
    })
}

fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent(format!("gitops-e2e/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Turn a non-success response into an error carrying the body text.
async fn ensure_success(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => Err(anyhow!(
            "{action} was rejected (status {status}); check GIT_ACCESS_TOKEN: {body}"
        )),
        reqwest::StatusCode::NOT_FOUND => Err(anyhow!("{action} failed: not found ({body})")),
        _ => Err(anyhow!("{action} failed (status {status}): {body}")),
    }
}

async fn ensure_deleted(response: Response, action: &str) -> Result<Deletion> {
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(Deletion::AlreadyAbsent);
    }
    ensure_success(response, action).await?;
    Ok(Deletion::Deleted)
}

/// Log the result of a delete call.
fn log_deletion(repo: &RepoRef, deletion: Deletion) {
    match deletion {
        Deletion::Deleted => info!(repository = %repo, "deleted repository"),
        Deletion::AlreadyAbsent => warn!(repository = %repo, "repository was already absent"),
    }
}
