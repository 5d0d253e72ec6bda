//! Command-line interface for composing a deployment notification.
//!
//! The deployment orchestrator writes the deployment context to a file and
//! runs `capgun --context deploy.toml`. The notification is printed to stdout
//! for the caller to deliver; logs go to stderr.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::PathBuf;

use crate::notifications::Notification;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "capgun")]
#[command(author, version, about = "Compose a deployment notification with the change log since the last release", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "CAPGUN_CONFIG", default_value = "capgun.toml")]
    pub config: PathBuf,

    /// Deployment context file written by the orchestrator (TOML or JSON)
    #[arg(long)]
    pub context: PathBuf,

    /// Override the deploying user
    #[arg(long)]
    pub actor: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Mail headers followed by the body
    Text,
    /// The notification as a JSON object
    Json,
}

/// Write the notification in the requested format
pub fn print_notification<W: Write>(out: &mut W, notification: &Notification, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "Subject: {}", notification.subject)?;
            writeln!(out, "From: {}", notification.from)?;
            writeln!(out, "To: {}", notification.recipients.join(", "))?;
            writeln!(out)?;
            write!(out, "{}", notification.body)?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, notification)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
