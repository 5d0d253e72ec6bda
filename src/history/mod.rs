//! Change log resolution.
//!
//! Looks up the commits between the previous and the current release, either
//! from the local `git`/`svn` tools or from the GitHub compare API. A failed
//! lookup never fails the notification: every error is logged and reported as
//! [`ChangeLog::Unavailable`].

mod error;
pub mod local;

pub use error::HistoryError;
pub use local::{CommandHistoryProvider, HistoryOutput, LocalHistoryProvider};

use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::HistoryConfig;
use crate::context::{DeploymentContext, ScmKind, UNKNOWN_REVISION};
use crate::github::{GitHubClient, RepoSlug};

/// Length of the abbreviated commit hashes taken from the GitHub API
pub const SHORT_HASH_LEN: usize = 7;

/// One commit in the change log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub short_hash: String,
    pub first_line: String,
}

impl CommitSummary {
    pub fn new(short_hash: impl Into<String>, first_line: impl Into<String>) -> Self {
        Self {
            short_hash: short_hash.into(),
            first_line: first_line.into(),
        }
    }

    /// Build a summary from a full commit id and a possibly multi-line message
    pub fn from_message(sha: &str, message: &str) -> Self {
        Self {
            short_hash: sha.chars().take(SHORT_HASH_LEN).collect(),
            first_line: message.lines().next().unwrap_or_default().to_string(),
        }
    }
}

/// Commits since the previous release
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeLog {
    Unavailable,
    Entries(Vec<CommitSummary>),
    /// Tool output kept verbatim (subversion log)
    Raw(String),
}

impl ChangeLog {
    /// Text for the "Commits since last release" section
    pub fn render(&self) -> String {
        match self {
            ChangeLog::Unavailable => "N/A".to_string(),
            ChangeLog::Entries(entries) => entries
                .iter()
                .map(|e| format!("{}:{}", e.short_hash, e.first_line))
                .collect::<Vec<_>>()
                .join("\n"),
            ChangeLog::Raw(text) => text.clone(),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, ChangeLog::Unavailable)
    }

    /// Parse `git log --pretty=format:%h:%s` output.
    ///
    /// Output that does not look like `hash:subject` lines is kept verbatim.
    fn from_git_log(stdout: &str) -> Self {
        let parsed: Option<Vec<CommitSummary>> = stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                line.split_once(':')
                    .map(|(hash, subject)| CommitSummary::new(hash, subject))
            })
            .collect();

        match parsed {
            Some(entries) => ChangeLog::Entries(entries),
            None => ChangeLog::Raw(stdout.to_string()),
        }
    }
}

/// Inputs for a single change log lookup
#[derive(Debug, Clone, Copy)]
pub struct HistoryQuery<'a> {
    pub scm: ScmKind,
    pub repository_url: &'a str,
    pub previous_revision: Option<&'a str>,
    pub current_revision: &'a str,
    pub github_token: Option<&'a str>,
}

impl<'a> HistoryQuery<'a> {
    pub fn from_context(ctx: &'a DeploymentContext) -> Self {
        Self {
            scm: ctx.scm,
            repository_url: &ctx.repository,
            previous_revision: ctx.previous_revision.as_deref(),
            current_revision: &ctx.current_revision,
            github_token: ctx.github_token.as_deref(),
        }
    }

    fn previous_revision(&self) -> &'a str {
        self.previous_revision.unwrap_or(UNKNOWN_REVISION)
    }
}

/// Chooses between local and remote history and degrades every failure to
/// [`ChangeLog::Unavailable`].
pub struct ChangeLogResolver {
    local: Arc<dyn LocalHistoryProvider>,
    github: GitHubClient,
}

impl ChangeLogResolver {
    pub fn new(local: Arc<dyn LocalHistoryProvider>, github: GitHubClient) -> Self {
        Self { local, github }
    }

    /// Resolver backed by the `git`/`svn` binaries and the configured GitHub API
    pub fn from_config(config: &HistoryConfig) -> Result<Self, HistoryError> {
        let local = CommandHistoryProvider::new(config.workdir.clone(), config.timeout());
        let github = GitHubClient::new(config.github_api_url.clone(), config.timeout())?;
        Ok(Self::new(Arc::new(local), github))
    }

    pub async fn resolve_for(&self, ctx: &DeploymentContext) -> ChangeLog {
        self.resolve(&HistoryQuery::from_context(ctx)).await
    }

    /// Look up the change log. Never fails.
    pub async fn resolve(&self, query: &HistoryQuery<'_>) -> ChangeLog {
        match self.try_resolve(query).await {
            Ok(log) => log,
            Err(HistoryError::UnsupportedScm(scm)) => {
                debug!(scm = %scm, "No change log for this scm");
                ChangeLog::Unavailable
            }
            Err(e) => {
                warn!(
                    scm = %query.scm,
                    from = %query.previous_revision(),
                    to = %query.current_revision,
                    error = %e,
                    "Change log unavailable"
                );
                ChangeLog::Unavailable
            }
        }
    }

    async fn try_resolve(&self, query: &HistoryQuery<'_>) -> Result<ChangeLog, HistoryError> {
        match query.scm {
            ScmKind::Git => match query.github_token {
                Some(token) => self.github_log(query, token).await,
                None => self.git_log(query).await,
            },
            ScmKind::Subversion => self.svn_log(query).await,
            ScmKind::Other => Err(HistoryError::UnsupportedScm(query.scm)),
        }
    }

    async fn git_log(&self, query: &HistoryQuery<'_>) -> Result<ChangeLog, HistoryError> {
        let output = self
            .local
            .git_log(query.previous_revision(), query.current_revision)
            .await?;

        if !output.success {
            return Err(HistoryError::CommandFailed("git"));
        }

        Ok(ChangeLog::from_git_log(&output.stdout))
    }

    async fn svn_log(&self, query: &HistoryQuery<'_>) -> Result<ChangeLog, HistoryError> {
        let previous = query.previous_revision();
        let from = previous
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|rev| rev.checked_add(1))
            .ok_or_else(|| HistoryError::NonNumericRevision(previous.to_string()))?;

        let output = self.local.svn_log(from, query.current_revision).await?;

        if !output.success {
            return Err(HistoryError::CommandFailed("svn"));
        }

        Ok(ChangeLog::Raw(output.stdout))
    }

    async fn github_log(&self, query: &HistoryQuery<'_>, token: &str) -> Result<ChangeLog, HistoryError> {
        let slug = RepoSlug::parse(query.repository_url)
            .ok_or_else(|| HistoryError::MalformedRepositoryUrl(query.repository_url.to_string()))?;

        debug!(repo = %slug, "Fetching change log from GitHub");

        let commits = self
            .github
            .compare(token, &slug, query.previous_revision(), query.current_revision)
            .await?;

        Ok(ChangeLog::Entries(commits))
    }
}
