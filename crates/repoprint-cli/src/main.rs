//! Repoprint - repository fingerprint indexer

use clap::Parser;
use repoprint_cli::{run, Command};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "repoprint")]
#[command(about = "Fingerprint repositories into a layered hash index")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "REPOPRINT_CONFIG")]
    config: Option<PathBuf>,

    /// Snapshot file holding the index
    #[arg(short, long, env = "REPOPRINT_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, env = "REPOPRINT_DEBUG")]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "REPOPRINT_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Logs go to stderr so command output stays clean on stdout
    let log_level = if args.debug { "debug" } else { "info" };
    // Target prefixes match, so this covers every repoprint_* crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("repoprint={}", log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let mut config = repoprint_cli::config::load(args.config.as_deref())?;
    if let Some(snapshot) = args.snapshot {
        config.snapshot = snapshot;
    }
    tracing::debug!(?config, "loaded configuration");

    run(args.command, config).await?;
    Ok(())
}
