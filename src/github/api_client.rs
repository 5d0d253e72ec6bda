//! GitHub API client for comparing two revisions of a repository.
//!
//! Only the compare endpoint is used: it lists the commits reachable from
//! `head` but not from `base`, oldest first.

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::history::{CommitSummary, HistoryError};

lazy_static! {
    // Accepts https://github.com/owner/repo(.git) and git@github.com:owner/repo(.git)
    static ref GITHUB_SLUG: Regex = Regex::new(r"github\.com[/:]([\w.-]+)/([\w.-]+)").unwrap();
}

/// `owner/repo` pair identifying a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    /// Extract the slug that follows `github.com` in a repository URL.
    pub fn parse(repository_url: &str) -> Option<Self> {
        let caps = GITHUB_SLUG.captures(repository_url)?;
        let owner = caps.get(1)?.as_str();
        let name = caps.get(2)?.as_str();
        let name = name.strip_suffix(".git").unwrap_or(name);

        if owner.is_empty() || name.is_empty() {
            return None;
        }

        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// GitHub API client authenticated with a personal access token.
pub struct GitHubClient {
    api_base: String,
    timeout: Duration,
    accept_invalid_certs: bool,
    client: reqwest::Client,
}

impl GitHubClient {
    /// Create a client for the given API base URL (e.g. `https://api.github.com`).
    ///
    /// Certificates are always verified.
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self, HistoryError> {
        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            timeout,
            accept_invalid_certs: false,
            client: build_http_client(timeout, false)?,
        })
    }

    /// Skip TLS certificate verification. Test builds only.
    #[cfg(test)]
    pub fn danger_accept_invalid_certs(mut self) -> Self {
        self.accept_invalid_certs = true;
        self.client = build_http_client(self.timeout, true).expect("http client");
        self
    }

    /// List the commits between `base` and `head`, one summary per commit.
    ///
    /// Anything but a 200 response is an error.
    pub async fn compare(
        &self,
        token: &str,
        slug: &RepoSlug,
        base: &str,
        head: &str,
    ) -> Result<Vec<CommitSummary>, HistoryError> {
        let url = format!(
            "{}/repos/{}/{}/compare/{}...{}",
            self.api_base, slug.owner, slug.name, base, head
        );

        debug!(url = %url, verify_tls = !self.accept_invalid_certs, "Requesting GitHub compare");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("token {}", token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    HistoryError::Timeout(self.timeout)
                } else {
                    HistoryError::Http(e)
                }
            })?;

        if response.status() != StatusCode::OK {
            return Err(HistoryError::ApiStatus(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        let compare: CompareResponse = serde_json::from_slice(&body)?;

        Ok(compare
            .commits
            .into_iter()
            .map(|c| CommitSummary::from_message(&c.sha, &c.commit.message))
            .collect())
    }
}

fn build_http_client(timeout: Duration, accept_invalid_certs: bool) -> Result<reqwest::Client, HistoryError> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("capgun/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()?;
    Ok(client)
}

// Response types

#[derive(Debug, Deserialize)]
struct CompareResponse {
    commits: Vec<CompareCommit>,
}

#[derive(Debug, Deserialize)]
struct CompareCommit {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: String,
}
