use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use capgun::cli::{print_notification, Cli};
use capgun::config::Config;
use capgun::{DeployNotifier, DeploymentContext};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging (stderr, stdout carries the notification)
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut context = DeploymentContext::load(&cli.context)?;
    if let Some(actor) = cli.actor {
        context.actor = actor;
    }

    let notifier = DeployNotifier::from_config(&config)?;
    let notification = notifier.compose(&context).await;

    let stdout = std::io::stdout();
    print_notification(&mut stdout.lock(), &notification, cli.format)?;

    Ok(())
}
