pub mod cli;
pub mod config;
pub mod context;
pub mod github;
pub mod history;
pub mod notifications;

pub use context::{DeploymentContext, ScmKind};
pub use history::{ChangeLog, ChangeLogResolver, CommitSummary};
pub use notifications::{DeployNotifier, Notification, ReportAssembler};
