//! HTTP release endpoint speaking the GitHub releases API.

use super::ReleaseEndpoint;
use crate::types::ReleaseMetadata;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("No release found at {url}")]
    NotFound { url: String },
    #[error("Failed to get release info from {url}: {status}")]
    RequestFailed { url: String, status: StatusCode },
}

/// Build the GitHub API URL for a repository's release
///
/// # Arguments
/// * `repo` - Repository in format "owner/repo"
/// * `version` - Optional tag ("latest" or `None` for the latest release)
pub fn build_gh_release_url(repo: &str, version: Option<&str>) -> String {
    match version {
        Some(v) if v != "latest" => {
            format!("https://api.github.com/repos/{}/releases/tags/{}", repo, v)
        }
        _ => format!("https://api.github.com/repos/{}/releases/latest", repo),
    }
}

pub struct HttpReleaseEndpoint {
    client: reqwest::Client,
    user_agent: String,
    token: Option<String>,
}

impl HttpReleaseEndpoint {
    pub fn new(user_agent: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent: user_agent.to_string(),
            token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

#[async_trait]
impl ReleaseEndpoint for HttpReleaseEndpoint {
    async fn fetch(&self, url: &str) -> Result<ReleaseMetadata> {
        tracing::debug!("Fetching release info from: {}", url);

        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", &self.user_agent);

        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {}", token));
            tracing::debug!("Using GITHUB_TOKEN");
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::NOT_FOUND {
                return Err(ReleaseError::NotFound {
                    url: url.to_string(),
                }
                .into());
            }
            return Err(ReleaseError::RequestFailed {
                url: url.to_string(),
                status,
            }
            .into());
        }

        let release: ReleaseMetadata = response.json().await?;
        Ok(release)
    }
}
