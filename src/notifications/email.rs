//! Email representation of a deployment notification.

use anyhow::{Context, Result};
use lettre::message::{header::ContentType, Mailbox};
use lettre::Message;

use super::Notification;

impl Notification {
    /// Build a plain-text email, ready for any lettre transport.
    ///
    /// Fails when no recipients are configured or an address does not parse.
    pub fn to_message(&self) -> Result<Message> {
        if self.recipients.is_empty() {
            anyhow::bail!("No notification recipients configured");
        }

        let from: Mailbox = self
            .from
            .parse()
            .with_context(|| format!("Invalid from address: {}", self.from))?;

        let mut builder = Message::builder()
            .from(from)
            .subject(self.subject.as_str())
            .header(ContentType::TEXT_PLAIN);

        for recipient in &self.recipients {
            let to: Mailbox = recipient
                .parse()
                .with_context(|| format!("Invalid recipient address: {}", recipient))?;
            builder = builder.to(to);
        }

        builder
            .body(self.body.clone())
            .context("Failed to build notification email")
    }
}
