use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::{
    Deletion, PullRequestRef, PullRequestSpec, RepoRef, ScmClient, ScmProvider, ensure_deleted,
    ensure_success, log_deletion,
};

pub struct GitHubClient {
    http: Client,
    api_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    number: u64,
    html_url: Option<String>,
}

impl GitHubClient {
    pub fn new(http: Client, api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.url(path))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
    }
}

#[async_trait]
impl ScmClient for GitHubClient {
    fn provider(&self) -> ScmProvider {
        ScmProvider::GitHub
    }

    async fn create_repository(&self, repo: &RepoRef, description: &str) -> Result<RepoRef> {
        let response = self
            .request(reqwest::Method::POST, "/user/repos")
            .json(&json!({
                "name": repo.name,
                "description": description,
                "private": false,
            }))
            .send()
            .await
            .context("Failed to send repository create request to GitHub")?;
        ensure_success(response, &format!("creating repository {}", repo.full_name())).await?;

        info!(repository = %repo, "created repository");
        Ok(repo.clone())
    }

    async fn delete_repository(&self, repo: &RepoRef) -> Result<Deletion> {
        let path = format!("/repos/{}", repo.full_name());
        let response = self
            .request(reqwest::Method::DELETE, &path)
            .send()
            .await
            .context("Failed to send repository delete request to GitHub")?;
        let deletion =
            ensure_deleted(response, &format!("deleting repository {}", repo.full_name())).await?;
        log_deletion(repo, deletion);
        Ok(deletion)
    }

    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        spec: &PullRequestSpec,
    ) -> Result<PullRequestRef> {
        let path = format!("/repos/{}/pulls", repo.full_name());
        let response = self
            .request(reqwest::Method::POST, &path)
            .json(&json!({
                "title": spec.title,
                "head": spec.head,
                "base": spec.base,
                "body": spec.body,
            }))
            .send()
            .await
            .context("Failed to send pull request create request to GitHub")?;
        let response = ensure_success(response, "creating pull request").await?;
        let pull: PullResponse = response
            .json()
            .await
            .context("Failed to parse GitHub pull request response")?;

        info!(repository = %repo, number = pull.number, "pull request created");
        Ok(PullRequestRef {
            number: pull.number,
            head: spec.head.clone(),
            url: pull.html_url,
        })
    }

    async fn merge_pull_request(
        &self,
        repo: &RepoRef,
        pull_request: &PullRequestRef,
    ) -> Result<()> {
        let path = format!("/repos/{}/pulls/{}/merge", repo.full_name(), pull_request.number);
        let response = self
            .request(reqwest::Method::PUT, &path)
            .json(&json!({}))
            .send()
            .await
            .context("Failed to send pull request merge request to GitHub")?;
        ensure_success(
            response,
            &format!("merging pull request #{}", pull_request.number),
        )
        .await?;
        info!(repository = %repo, number = pull_request.number, "pull request merged");

        // GitHub has no delete-source-branch flag on merge.
        let branch = format!(
            "/repos/{}/git/refs/heads/{}",
            repo.full_name(),
            pull_request.head
        );
        let deleted = self
            .request(reqwest::Method::DELETE, &branch)
            .send()
            .await
            .context("Failed to send branch delete request to GitHub")?;
        if let Err(error) = ensure_success(deleted, "deleting source branch").await {
            warn!(branch = %pull_request.head, %error, "source branch was not deleted");
        }

        Ok(())
    }
}
