//! Deployment notifications.
//!
//! This module composes the notification sent after a release: the change log
//! is looked up, then rendered together with the deployment metadata into a
//! subject and a plain-text body. Delivery is left to the caller, which can
//! turn a [`Notification`] into an email with [`Notification::to_message`].

pub mod email;
pub mod report;

pub use report::{humanize_release_time, LocalZone, ReportAssembler};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::config::{Config, EnvelopeConfig};
use crate::context::DeploymentContext;
use crate::history::ChangeLogResolver;

/// A rendered notification with its addressing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
    pub from: String,
}

/// Looks up the change log for a deployment and renders the notification
pub struct DeployNotifier {
    resolver: ChangeLogResolver,
    assembler: ReportAssembler,
    envelope: EnvelopeConfig,
}

impl DeployNotifier {
    pub fn new(resolver: ChangeLogResolver, assembler: ReportAssembler, envelope: EnvelopeConfig) -> Self {
        Self {
            resolver,
            assembler,
            envelope,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let resolver = ChangeLogResolver::from_config(&config.history)
            .context("Failed to set up change log lookup")?;
        let assembler = ReportAssembler::new(config.time.zone_label.clone());
        Ok(Self::new(resolver, assembler, config.envelope.clone()))
    }

    /// Build the notification for a finished deployment. Never fails because
    /// of the change log; at worst the commit list reads "N/A".
    pub async fn compose(&self, ctx: &DeploymentContext) -> Notification {
        let change_log = self.resolver.resolve_for(ctx).await;
        let notification = self.assembler.render(ctx, &change_log, &self.envelope);

        info!(
            application = %ctx.application,
            subject = %notification.subject,
            change_log = change_log.is_available(),
            recipients = notification.recipients.len(),
            "Composed deployment notification"
        );

        notification
    }
}
