//! Deployment metadata handed over by the deployment orchestrator.
//!
//! A `DeploymentContext` is built once per notification and never mutated.
//! It is usually read from a TOML or JSON file the orchestrator writes after
//! the release has been switched over.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Revision reported when the orchestrator does not know the previous one.
pub const UNKNOWN_REVISION: &str = "n/a";

/// Source control system the application is deployed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScmKind {
    Git,
    Subversion,
    #[serde(other)]
    Other,
}

impl ScmKind {
    /// Whether commit history can be looked up for this SCM
    pub fn has_history(&self) -> bool {
        matches!(self, ScmKind::Git | ScmKind::Subversion)
    }
}

impl fmt::Display for ScmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScmKind::Git => write!(f, "git"),
            ScmKind::Subversion => write!(f, "subversion"),
            ScmKind::Other => write!(f, "other"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DeploymentContext {
    pub application: String,
    /// Deployment target label (e.g. "production")
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default = "default_scm")]
    pub scm: ScmKind,
    pub repository: String,
    pub current_revision: String,
    #[serde(default)]
    pub previous_revision: Option<String>,
    /// Release directory, ending in a UTC `YYYYMMDDHHMMSS` timestamp
    #[serde(default)]
    pub current_release: Option<String>,
    #[serde(default)]
    pub previous_release: Option<String>,
    pub deploy_to: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    /// When set, git history is fetched from the GitHub compare API
    #[serde(default, skip_serializing)]
    pub github_token: Option<String>,
    #[serde(default = "current_user")]
    pub actor: String,
}

fn default_scm() -> ScmKind {
    ScmKind::Git
}

impl DeploymentContext {
    /// Load a context file. Files ending in `.json` are parsed as JSON, anything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read deployment context: {}", path.display()))?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let context: DeploymentContext = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse deployment context: {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse deployment context: {}", path.display()))?
        };

        debug!(
            application = %context.application,
            scm = %context.scm,
            revision = %context.current_revision,
            "Loaded deployment context"
        );

        Ok(context)
    }

    /// The previous revision, or `"n/a"` on a first deploy
    pub fn previous_revision(&self) -> &str {
        self.previous_revision.as_deref().unwrap_or(UNKNOWN_REVISION)
    }

    /// "deployed to production", or just "deployed" without an environment
    pub fn deployed_to(&self) -> String {
        match &self.environment {
            Some(env) => format!("deployed to {}", env),
            None => "deployed".to_string(),
        }
    }
}

impl fmt::Debug for DeploymentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentContext")
            .field("application", &self.application)
            .field("environment", &self.environment)
            .field("scm", &self.scm)
            .field("repository", &self.repository)
            .field("current_revision", &self.current_revision)
            .field("previous_revision", &self.previous_revision)
            .field("current_release", &self.current_release)
            .field("previous_release", &self.previous_release)
            .field("deploy_to", &self.deploy_to)
            .field("domain", &self.domain)
            .field("branch", &self.branch)
            .field("comment", &self.comment)
            .field("github_token", &self.github_token.as_ref().map(|_| "[redacted]"))
            .field("actor", &self.actor)
            .finish()
    }
}

/// Name of the OS user running the deploy
pub fn current_user() -> String {
    ["USER", "LOGNAME", "USERNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
