//! Local commit history, read by running the SCM command line tools.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::HistoryError;

/// Output of a finished history command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryOutput {
    pub success: bool,
    pub stdout: String,
}

impl HistoryOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
        }
    }

    pub fn failure() -> Self {
        Self {
            success: false,
            stdout: String::new(),
        }
    }
}

/// Source of local commit history, one method per SCM.
#[async_trait]
pub trait LocalHistoryProvider: Send + Sync {
    /// `git log {from}..{to} --pretty=format:%h:%s`
    async fn git_log(&self, from: &str, to: &str) -> Result<HistoryOutput, HistoryError>;

    /// `svn log -r {from}:{to}`
    async fn svn_log(&self, from: u64, to: &str) -> Result<HistoryOutput, HistoryError>;
}

/// Runs `git`/`svn` as child processes, killing them when the timeout expires.
pub struct CommandHistoryProvider {
    workdir: Option<PathBuf>,
    timeout: Duration,
}

impl CommandHistoryProvider {
    pub fn new(workdir: Option<PathBuf>, timeout: Duration) -> Self {
        Self { workdir, timeout }
    }

    async fn run(&self, program: &'static str, args: &[String]) -> Result<HistoryOutput, HistoryError> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| HistoryError::Timeout(self.timeout))?
            .map_err(|source| HistoryError::Spawn { program, source })?;

        if !output.status.success() {
            debug!(
                program,
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "History command failed"
            );
            return Ok(HistoryOutput::failure());
        }

        Ok(HistoryOutput::success(String::from_utf8_lossy(&output.stdout)))
    }
}

/// Revisions are passed as positional arguments; a leading `-` would be read as an option.
fn check_revision(revision: &str) -> Result<(), HistoryError> {
    if revision.trim_start().starts_with('-') {
        return Err(HistoryError::InvalidRevision(revision.to_string()));
    }
    Ok(())
}

#[async_trait]
impl LocalHistoryProvider for CommandHistoryProvider {
    async fn git_log(&self, from: &str, to: &str) -> Result<HistoryOutput, HistoryError> {
        check_revision(from)?;
        check_revision(to)?;

        let args = vec![
            "log".to_string(),
            format!("{}..{}", from, to),
            "--pretty=format:%h:%s".to_string(),
        ];
        self.run("git", &args).await
    }

    async fn svn_log(&self, from: u64, to: &str) -> Result<HistoryOutput, HistoryError> {
        check_revision(to)?;

        let args = vec![
            "log".to_string(),
            "-r".to_string(),
            format!("{}:{}", from, to),
        ];
        self.run("svn", &args).await
    }
}
