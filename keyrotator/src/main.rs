//! KeyRotator - Secrets Manager rotation for IAM access keys
//!
//! Runs as the rotation Lambda for secrets holding `{"User": "<iam user>"}`,
//! or invokes a single rotation step from the command line.

mod config;
mod lambda;

use clap::{Parser, Subcommand};
use keyrotator_aws::{IamCredentialStore, SecretsManagerStore};
use keyrotator_core::RotationEvent;
use keyrotator_rotation::RotationHandler;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "keyrotator")]
#[command(about = "Secrets Manager rotation function for IAM access keys", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(long, env = "KEYROTATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "KEYROTATOR_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve rotation events from the Lambda runtime API (default)
    Serve,

    /// Run one rotation step against the configured account and exit
    Invoke {
        /// Secret name or ARN
        #[arg(long)]
        secret_id: String,

        /// ClientRequestToken of the version being rotated
        #[arg(long)]
        token: String,

        /// createSecret, setSecret, testSecret or finishSecret
        #[arg(long)]
        step: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = config::Config::load(args.config.as_deref())?;

    // Initialize tracing
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "keyrotator={level},keyrotator_rotation={level},keyrotator_aws={level}"
                )
                .into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(config.logging.ansi)
                .without_time(),
        )
        .init();

    let sdk_config = keyrotator_aws::load_sdk_config(&config.aws).await;
    let handler = Arc::new(RotationHandler::new(
        Arc::new(SecretsManagerStore::new(&sdk_config)),
        Arc::new(IamCredentialStore::new(&sdk_config)),
    ));

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!("Starting KeyRotator on the Lambda runtime");
            lambda::run(handler).await.map_err(|e| anyhow::anyhow!(e))
        }
        Command::Invoke {
            secret_id,
            token,
            step,
        } => {
            let outcome = handler
                .handle_event(RotationEvent {
                    secret_id,
                    client_request_token: token,
                    step,
                })
                .await?;
            info!(outcome = ?outcome, "Rotation step complete");
            Ok(())
        }
    }
}
