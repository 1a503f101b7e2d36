//! Sentinel - content-safety monitoring CLI

mod args;
mod stream;

use clap::Parser;
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use args::{Args, Command};
use sentinel::{ContentMonitor, ContentSubmission};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let config = args.resolve_config().await?;

    // Logs go to stderr; stdout carries JSON results
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("sentinel={},info", config.general.log_level).into());
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    if config.detection.image_enabled && config.classifier.endpoint.is_none() {
        warn!("No classifier endpoint configured; image submissions will be held for review");
    }
    info!(
        config = args.config.as_deref().unwrap_or("<defaults>"),
        audit = config.audit.path.as_deref().unwrap_or("<memory>"),
        "Sentinel starting"
    );

    let monitor = ContentMonitor::with_config(config)?;

    match args.command {
        Command::Check {
            user,
            component,
            text,
            image,
        } => {
            let mut submission = ContentSubmission::new(user, component);
            if let Some(text) = text {
                submission = submission.with_text(text);
            }
            if let Some(image) = image {
                submission = submission.with_image(image);
            }

            let outcome = monitor.check_content(submission).await?;
            monitor.logger().flush().await;

            let mut stdout = tokio::io::stdout();
            let mut encoded = serde_json::to_string_pretty(&outcome)?;
            encoded.push('\n');
            stdout.write_all(encoded.as_bytes()).await?;
            stdout.flush().await?;
        }
        Command::Stream => {
            let handled = stream::run(
                &monitor,
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
            )
            .await?;
            monitor.logger().flush().await;
            info!(lines = handled, "Stream closed");
        }
    }

    Ok(())
}
