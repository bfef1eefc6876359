use std::time::Duration;

use serde::Deserialize;

use crate::codehost::{CodeHost, PullRequest};
use crate::error::{ReleaseError, Result};

/// GitHub REST API client, scoped to one repository.
pub struct GitHubClient {
    /// GitHub API base URL
    base_url: String,

    /// `owner/repo`
    repository: String,

    /// Personal access token
    token: String,

    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    number: u64,
    title: String,
    merge_commit_sha: Option<String>,
    merged: Option<bool>,
}

impl GitHubClient {
    /// Create a client for `repository` (`owner/repo`).
    pub fn connect(
        base_url: impl Into<String>,
        repository: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("release-tool/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(GitHubClient {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            repository: repository.into(),
            token: token.into(),
            client,
        })
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/repos/{}{}", self.base_url, self.repository, path);
        tracing::debug!(%url, "GET");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()?;

        let status = response.status();
        if status.is_success() {
            response.json().map_err(|e| {
                ReleaseError::code_host(format!("Invalid response from {}: {}", url, e))
            })
        } else {
            let message = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(ReleaseError::code_host(format!(
                "GET {} returned {}: {}",
                url,
                status.as_u16(),
                message
            )))
        }
    }
}

impl CodeHost for GitHubClient {
    fn pull_request(&self, number: u64) -> Result<PullRequest> {
        let pull: PullResponse = self.get(&format!("/pulls/{}", number))?;

        // GitHub reports a test-merge SHA for open pull requests.
        let merge_commit_sha = match pull.merged {
            Some(false) => None,
            _ => pull.merge_commit_sha,
        };

        Ok(PullRequest {
            number: pull.number,
            title: pull.title,
            merge_commit_sha,
        })
    }
}
