use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{
    Deletion, PullRequestRef, PullRequestSpec, RepoRef, ScmClient, ScmProvider, ensure_deleted,
    ensure_success, log_deletion,
};

pub struct GitLabClient {
    http: Client,
    api_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct MergeRequestResponse {
    iid: u64,
    web_url: Option<String>,
}

impl GitLabClient {
    pub fn new(http: Client, api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_url, path))
            .header("PRIVATE-TOKEN", &self.token)
    }
}

/// GitLab addresses projects by their URL-encoded full path.
pub(super) fn project_id(repo: &RepoRef) -> String {
    repo.full_name().replace('/', "%2F")
}

#[async_trait]
impl ScmClient for GitLabClient {
    fn provider(&self) -> ScmProvider {
        ScmProvider::GitLab
    }

    async fn create_repository(&self, repo: &RepoRef, description: &str) -> Result<RepoRef> {
        let response = self
            .request(reqwest::Method::POST, "/projects")
            .json(&json!({
                "name": repo.name,
                "path": repo.name,
                "description": description,
                "visibility": "public",
            }))
            .send()
            .await
            .context("Failed to send project create request to GitLab")?;
        ensure_success(response, &format!("creating project {}", repo.full_name())).await?;

        info!(repository = %repo, "created repository");
        Ok(repo.clone())
    }

    async fn delete_repository(&self, repo: &RepoRef) -> Result<Deletion> {
        let path = format!("/projects/{}", project_id(repo));
        let response = self
            .request(reqwest::Method::DELETE, &path)
            .send()
            .await
            .context("Failed to send project delete request to GitLab")?;
        let deletion =
            ensure_deleted(response, &format!("deleting project {}", repo.full_name())).await?;
        log_deletion(repo, deletion);
        Ok(deletion)
    }

    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        spec: &PullRequestSpec,
    ) -> Result<PullRequestRef> {
        let path = format!("/projects/{}/merge_requests", project_id(repo));
        let response = self
            .request(reqwest::Method::POST, &path)
            .json(&json!({
                "source_branch": spec.head,
                "target_branch": spec.base,
                "title": spec.title,
                "description": spec.body,
                "remove_source_branch": true,
            }))
            .send()
            .await
            .context("Failed to send merge request create request to GitLab")?;
        let response = ensure_success(response, "creating merge request").await?;
        let merge_request: MergeRequestResponse = response
            .json()
            .await
            .context("Failed to parse GitLab merge request response")?;

        info!(repository = %repo, iid = merge_request.iid, "merge request created");
        Ok(PullRequestRef {
            number: merge_request.iid,
            head: spec.head.clone(),
            url: merge_request.web_url,
        })
    }

    async fn merge_pull_request(
        &self,
        repo: &RepoRef,
        pull_request: &PullRequestRef,
    ) -> Result<()> {
        let path = format!(
            "/projects/{}/merge_requests/{}/merge",
            project_id(repo),
            pull_request.number
        );
        let response = self
            .request(reqwest::Method::PUT, &path)
            .json(&json!({ "should_remove_source_branch": true }))
            .send()
            .await
            .context("Failed to send merge request merge to GitLab")?;
        ensure_success(
            response,
            &format!("merging merge request !{}", pull_request.number),
        )
        .await?;

        info!(repository = %repo, iid = pull_request.number, "merge request merged");
        Ok(())
    }
}
