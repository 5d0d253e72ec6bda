use std::time::Duration;
use thiserror::Error;

use crate::context::ScmKind;

/// Why a change log could not be produced.
///
/// None of these reach the caller of `ChangeLogResolver::resolve`; they are
/// logged and turned into `ChangeLog::Unavailable`.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("no history lookup for scm '{0}'")]
    UnsupportedScm(ScmKind),

    #[error("previous revision '{0}' is not a subversion revision number")]
    NonNumericRevision(String),

    #[error("revision '{0}' looks like a command line option")]
    InvalidRevision(String),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} exited with a nonzero status")]
    CommandFailed(&'static str),

    #[error("history lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("no github owner/repo in repository url '{0}'")]
    MalformedRepositoryUrl(String),

    #[error("github compare returned HTTP {0}")]
    ApiStatus(u16),

    #[error("github request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode github response: {0}")]
    Decode(#[from] serde_json::Error),
}
